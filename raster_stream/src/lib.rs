//! Region-splitting streaming engine for demand-driven raster pipelines.
//!
//! Filters are wired into a [`pipeline::Pipeline`]. Updating a node computes
//! only the part of the image it was asked for, reusing cached upstream
//! outputs where they are still fresh. [`driver::StreamingWriter`] repeats that
//! update once per split produced by a [`splitter::StreamingManager`], so images
//! larger than memory can be written piece by piece.

pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod filters;
pub mod persistent;
pub mod pipeline;
pub mod region;
pub mod sink;
pub mod splitter;

#[cfg(test)]
mod tests;

pub use buffer::{BufferViewMut, ImageBuffer};
pub use config::StreamingConfig;
pub use driver::{StreamingProgress, StreamingReport, StreamingWriter};
pub use error::{StreamError, StreamResult};
pub use persistent::{stream_persistent, Accumulate, PersistentFilter};
pub use pipeline::{ExecutionContext, Filter, NodeId, NodeState, OutputInformation, Pipeline};
pub use region::Region;
pub use sink::{ImageSink, MemorySink, NullSink, RawFileSink};
pub use splitter::{MemoryLayout, StreamingManager, StreamingMode};
