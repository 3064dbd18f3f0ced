//! Data types for the price comparison library.

pub mod auction;
pub mod config;
pub mod page;
pub mod price;
pub mod product;
pub mod response;
