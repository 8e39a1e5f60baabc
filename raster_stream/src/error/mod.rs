//! Error types for pipeline updates and streaming writes.


use thiserror::Error;

use crate::pipeline::NodeId;

/// Errors raised at the phase boundaries of a pipeline update and by the streaming loop.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(
        "Requested region of node {node} ({requested}) is outside its largest possible region ({largest})"
    )]
    RegionConsistency {
        node: NodeId,
        requested: String,
        largest: String,
    },

    #[error("Splits do not partition the full region: {reason}")]
    SplitInvariant { reason: String },

    #[error("Output information failed for node {node}: {source}")]
    OutputInformation {
        node: NodeId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Data generation failed for node {node}: {source}")]
    Generate {
        node: NodeId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Node {node} does not hold a {expected}")]
    UnexpectedFilter { node: NodeId, expected: &'static str },

    #[error("Node name {0:?} is already taken")]
    DuplicateNodeName(String),

    #[error("Worker pool could not be built: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Sink write failed: {0}")]
    Sink(#[from] std::io::Error),

    #[error("Streaming aborted at split {split_index} after {committed} committed splits: {source}")]
    StreamingAborted {
        split_index: usize,
        committed: usize,
        #[source]
        source: Box<StreamError>,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] common::FileFormatError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] common::log_setup::LogSetupError),
}

pub type StreamResult<T> = std::result::Result<T, StreamError>;

impl StreamError {
    /// Unwraps [`StreamError::StreamingAborted`] down to the error that stopped the loop.
    pub fn root(&self) -> &StreamError {
        match self {
            StreamError::StreamingAborted { source, .. } => source.root(),
            other => other,
        }
    }
}
