//! Small filters for building pipelines: sources, pointwise and neighborhood steps.

mod neighborhood;
mod pointwise;
mod source;


pub use neighborhood::BoxMean;
pub use pointwise::{ShiftScale, Sum};
pub use source::{BufferSource, FnSource};
