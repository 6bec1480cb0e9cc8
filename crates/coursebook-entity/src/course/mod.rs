//! Course catalog and capacity ledger entities.

pub mod capacity;
pub mod model;

pub use capacity::CapacityEntry;
pub use model::{Course, NewCourse};
