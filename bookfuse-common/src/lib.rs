//! Shared types for the bookfuse catalog pipeline
//!
//! Everything that must behave identically across crates lives here:
//! the common error type, data directory resolution, and above all the
//! identity normalization rules that make cross-source joins possible.

pub mod config;
pub mod error;
pub mod normalize;

pub use error::{Error, Result};
