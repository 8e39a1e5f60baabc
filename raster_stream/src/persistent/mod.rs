//! Filters that reduce a streamed image into a result without keeping the pixels.
//!
//! ```text
//! reset(threads) ──► generate(split, thread) * ──► synthetize()
//!   Reset              Accumulating                 Synthesized
//! ```
//!
//! Each worker thread owns one partial slot. Partials are merged in thread order
//! once every split has been processed.

mod kernels;

#[cfg(test)]
mod tests;

use std::mem::take;

use anyhow::{anyhow, bail, Context};
use parking_lot::Mutex;

pub use kernels::{PixelStatistics, Sample, SampleCollector, Statistics};

use crate::buffer::{BufferViewMut, ImageBuffer};
use crate::driver::{StreamingReport, StreamingWriter};
use crate::error::{StreamError, StreamResult};
use crate::pipeline::{ExecutionContext, Filter, NodeId, Pipeline};
use crate::region::Region;
use crate::sink::NullSink;

/// Reduction carried out by a [`PersistentFilter`].
pub trait Accumulate<const D: usize>: Send + Sync + 'static {
    type Partial: Send + 'static;
    type Output: Send + Sync + 'static;

    fn name(&self) -> &str;

    fn new_partial(&self) -> Self::Partial;

    /// Folds the pixels of `input` inside `region` into `partial`.
    fn accumulate(&self, partial: &mut Self::Partial, input: &ImageBuffer<D>, region: &Region<D>);

    /// Combines partials given in thread-index order.
    fn merge(&self, partials: Vec<Self::Partial>) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum PersistentState {
    #[default]
    Reset,
    Accumulating,
    Synthesized,
}

/// Pass-through filter accumulating its input into per-thread partials.
pub struct PersistentFilter<K: Accumulate<D>, const D: usize> {
    kernel: K,
    slots: Vec<Mutex<K::Partial>>,
    result: Option<K::Output>,
    valid: bool,
    state: PersistentState,
}

impl<K: Accumulate<D>, const D: usize> PersistentFilter<K, D> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            slots: Vec::new(),
            result: None,
            valid: false,
            state: PersistentState::Reset,
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Fresh partial per worker slot. Keeps the last merged result but marks it invalid.
    pub fn reset(&mut self, threads: usize) {
        self.slots = (0..threads.max(1))
            .map(|_| Mutex::new(self.kernel.new_partial()))
            .collect();
        self.valid = false;
        self.state = PersistentState::Reset;

        tracing::debug!(kernel = self.kernel.name(), threads = self.slots.len(), "Accumulator reset");
    }

    /// Merges the partials into the result. Without a preceding reset there is
    /// nothing to merge and the previous result is left alone.
    pub fn synthetize(&mut self) {
        if self.slots.is_empty() {
            tracing::warn!(kernel = self.kernel.name(), "Synthetize without reset ignored");
            return;
        }

        let partials = take(&mut self.slots)
            .into_iter()
            .map(Mutex::into_inner)
            .collect();
        self.result = Some(self.kernel.merge(partials));
        self.valid = true;
        self.state = PersistentState::Synthesized;

        tracing::debug!(kernel = self.kernel.name(), "Accumulator synthetized");
    }

    /// True once synthetize ran after the latest reset.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The merged result of the latest complete pass.
    pub fn result(&self) -> Option<&K::Output> {
        self.result.as_ref().filter(|_| self.valid)
    }

    /// The most recent merged result, even if a later pass was reset or aborted.
    pub fn last_result(&self) -> Option<&K::Output> {
        self.result.as_ref()
    }

    pub fn state(&self) -> PersistentState {
        self.state
    }
}

impl<K: Accumulate<D>, const D: usize> Filter<D> for PersistentFilter<K, D> {
    fn name(&self) -> &str {
        self.kernel.name()
    }

    fn before_generate(&mut self, _requested: &Region<D>) -> anyhow::Result<()> {
        if self.slots.is_empty() {
            bail!("{} must be reset before it accumulates", self.kernel.name());
        }
        self.state = PersistentState::Accumulating;
        Ok(())
    }

    fn generate(
        &self,
        inputs: &[&ImageBuffer<D>],
        output: &mut BufferViewMut<'_, D>,
        thread_index: usize,
    ) -> anyhow::Result<()> {
        let input = inputs
            .first()
            .with_context(|| format!("{} needs an input", self.kernel.name()))?;
        output.copy_from(input);

        let slot = self.slots.get(thread_index).ok_or_else(|| {
            anyhow!(
                "thread {thread_index} has no accumulator slot ({} reset)",
                self.slots.len()
            )
        })?;
        self.kernel
            .accumulate(&mut slot.lock(), input, output.region());
        Ok(())
    }
}

/// Resets the persistent filter at `node`, streams it into a [`NullSink`] and
/// synthetizes. An aborted stream leaves the filter unsynthetized.
pub fn stream_persistent<K: Accumulate<D>, const D: usize>(
    pipeline: &mut Pipeline<D>,
    node: NodeId,
    writer: &mut StreamingWriter<D>,
    ctx: &ExecutionContext,
) -> StreamResult<StreamingReport<D>> {
    let threads = ctx.worker_threads();
    pipeline
        .modify_filter::<PersistentFilter<K, D>, _>(node, |filter| filter.reset(threads))
        .ok_or(StreamError::UnexpectedFilter {
            node,
            expected: "persistent filter",
        })?;

    let report = writer.write(pipeline, node, &mut NullSink::default(), ctx)?;

    if let Some(filter) = pipeline.filter_mut::<PersistentFilter<K, D>>(node) {
        filter.synthetize();
    }

    Ok(report)
}
