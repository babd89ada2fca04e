//! # lightbase-core
//!
//! Core crate for the Lightbase platform. Contains configuration schemas,
//! domain events, and the unified error system with its stable wire keys.
//!
//! This crate has **no** internal dependencies on other Lightbase crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
