//! AI collaborator implementations.
//!
//! Reference implementations of the `ProductAI` trait. Deployments can
//! use these directly or implement their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
