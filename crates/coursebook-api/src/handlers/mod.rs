//! HTTP request handlers.

pub mod booking;
pub mod course;
pub mod health;
