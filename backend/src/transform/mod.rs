//! Transformation module.
//!
//! - Mapper: one parsed row to one post request
//! - Pipeline: sequential batch runner

pub mod mapper;
pub mod pipeline;

pub use mapper::{map, TEMPLATE_COLUMNS};
pub use pipeline::BatchRunner;
