//! Transformation module.
//!
//! - Ids: sequential, collision-free record identifiers
//! - Projector: table rows to output records
//! - Pipeline: job runner writing `.min.json` files

pub mod ids;
pub mod pipeline;
pub mod projector;

pub use ids::IdAllocator;
pub use pipeline::*;
pub use projector::{convert, normalize_cell, Conversion, Projection};
