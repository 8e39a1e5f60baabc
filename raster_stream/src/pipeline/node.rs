use std::fmt;

use crate::buffer::ImageBuffer;
use crate::region::Region;

use super::filter::{Filter, OutputInformation};

/// Handle of a node inside its [`super::Pipeline`].
#[derive(Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn from_index(index: usize) -> NodeId {
        NodeId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Freshness of a node's cached output for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum NodeState {
    #[default]
    Stale,
    Computing,
    Fresh,
}

pub(crate) struct Node<const D: usize> {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) filter: Box<dyn Filter<D>>,

    // consumer -> producer
    pub(crate) inputs: Vec<NodeId>,
    // producer -> consumer, invalidation fan-out only
    pub(crate) consumers: Vec<NodeId>,

    pub(crate) info: OutputInformation<D>,
    pub(crate) requested_region: Region<D>,
    pub(crate) requested_set: bool,
    pub(crate) output: ImageBuffer<D>,

    /// Last modification of this node's filter.
    pub(crate) mtime: u64,
    /// Newest `mtime` of this node and everything upstream, refreshed in Phase A.
    pub(crate) pipeline_mtime: u64,
    pub(crate) information_mtime: u64,
    /// Clock value at the last successful Phase C execution.
    pub(crate) update_mtime: u64,

    pub(crate) data_released: bool,
    pub(crate) release_data_flag: bool,

    pub(crate) state: NodeState,
    pub(crate) needs_generate: bool,
}

impl<const D: usize> Node<D> {
    pub(crate) fn new(
        id: NodeId,
        name: String,
        filter: Box<dyn Filter<D>>,
        inputs: Vec<NodeId>,
        mtime: u64,
    ) -> Self {
        Self {
            id,
            name,
            filter,
            inputs,
            consumers: Vec::new(),
            info: OutputInformation::default(),
            requested_region: Region::null(),
            requested_set: false,
            output: ImageBuffer::default(),
            mtime,
            pipeline_mtime: mtime,
            information_mtime: 0,
            update_mtime: 0,
            data_released: false,
            release_data_flag: false,
            state: NodeState::Stale,
            needs_generate: false,
        }
    }

    pub(crate) fn buffered_region(&self) -> Region<D> {
        *self.output.region()
    }

    /// Output must be recomputed before it can serve `requested`.
    pub(crate) fn is_stale_for(&self, requested: &Region<D>) -> bool {
        self.update_mtime < self.pipeline_mtime
            || self.data_released
            || !self.buffered_region().contains(requested)
    }

    pub(crate) fn release(&mut self) {
        self.output = ImageBuffer::default();
        self.data_released = true;
        self.state = NodeState::Stale;
    }
}
