//! Detection domain module.
//!
//! - `model`: a single model finding (`Detection`, `BoundingBox`)
//! - `reducer`: collapse same-label findings to the most confident one

mod model;
mod reducer;

pub use model::{BoundingBox, Detection};
pub use reducer::reduce;
