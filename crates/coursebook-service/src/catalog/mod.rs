//! Course catalog services.

pub mod service;

pub use service::{CatalogService, CourseAvailability};
