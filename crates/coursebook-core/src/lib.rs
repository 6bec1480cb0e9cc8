//! # coursebook-core
//!
//! Core crate for Coursebook. Contains configuration schemas, typed
//! identifiers, cursor pagination, the cache provider trait, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other Coursebook crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
