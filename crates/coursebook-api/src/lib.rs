//! # coursebook-api
//!
//! HTTP API layer for Coursebook built on Axum.
//!
//! Provides the booking and catalog endpoints, health probes, request-id
//! and logging middleware, DTOs, and the mapping from [`ErrorKind`] to
//! HTTP status codes.
//!
//! [`ErrorKind`]: coursebook_core::ErrorKind

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
