//! Collaborator seams for the price comparison library.
//!
//! These traits define the interfaces that applications implement to
//! provide site adapters, AI normalization, and web price search.

pub mod adapter;
pub mod ai;
pub mod searcher;
