use crate::dispatch::ThreadedDispatch;
use crate::error::StreamResult;

/// Per-update execution settings handed to [`super::Pipeline::update`].
pub struct ExecutionContext {
    dispatch: ThreadedDispatch,
    release_data: bool,
}

impl ExecutionContext {
    /// `worker_threads == 0` uses rayon's default width.
    pub fn new(worker_threads: usize) -> StreamResult<Self> {
        Ok(Self {
            dispatch: ThreadedDispatch::new(worker_threads)?,
            release_data: false,
        })
    }

    pub fn single_threaded() -> StreamResult<Self> {
        Self::new(1)
    }

    /// Drop intermediate buffers once every consumer in the update has read them.
    pub fn with_release_data(mut self, release_data: bool) -> Self {
        self.release_data = release_data;
        self
    }

    pub fn release_data(&self) -> bool {
        self.release_data
    }

    pub fn worker_threads(&self) -> usize {
        self.dispatch.width()
    }

    pub(crate) fn dispatch(&self) -> &ThreadedDispatch {
        &self.dispatch
    }
}
