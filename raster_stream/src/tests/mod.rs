//! Cross-module scenarios and the helpers they share with module tests.

mod streaming_tests;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;

use crate::buffer::{BufferViewMut, ImageBuffer};
use crate::filters::FnSource;
use crate::pipeline::{Filter, OutputInformation};
use crate::region::Region;

/// Integer-valued two-component ramp, exact under any summation order.
pub(crate) fn ramp_source(size: [u64; 2]) -> FnSource<2> {
    FnSource::new(Region::from_size(size), 2, |index, pixel| {
        pixel[0] = (index[0] + 1000 * index[1]) as f32;
        pixel[1] = (index[0] % 7) as f32;
    })
}

/// Wraps a filter and counts its executions (one per Phase C run, not per strip).
pub(crate) struct Counted<F> {
    inner: F,
    runs: Arc<AtomicUsize>,
}

impl<F> Counted<F> {
    pub(crate) fn new(inner: F) -> (Self, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                runs: Arc::clone(&runs),
            },
            runs,
        )
    }
}

pub(crate) fn runs(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

impl<F: Filter<2>> Filter<2> for Counted<F> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn output_information(
        &self,
        inputs: &[OutputInformation<2>],
    ) -> anyhow::Result<OutputInformation<2>> {
        self.inner.output_information(inputs)
    }

    fn compute_requested_region(
        &self,
        input_index: usize,
        output_requested: &Region<2>,
        input_largest: &Region<2>,
    ) -> Region<2> {
        self.inner
            .compute_requested_region(input_index, output_requested, input_largest)
    }

    fn before_generate(&mut self, requested: &Region<2>) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.inner.before_generate(requested)
    }

    fn generate(
        &self,
        inputs: &[&ImageBuffer<2>],
        output: &mut BufferViewMut<'_, 2>,
        thread_index: usize,
    ) -> anyhow::Result<()> {
        self.inner.generate(inputs, output, thread_index)
    }

    fn after_generate(&mut self) -> anyhow::Result<()> {
        self.inner.after_generate()
    }
}

/// Pass-through that fails whenever it is asked for pixels overlapping `poison`.
pub(crate) struct FailOnRegion {
    pub(crate) poison: Region<2>,
}

impl Filter<2> for FailOnRegion {
    fn name(&self) -> &str {
        "fail_on_region"
    }

    fn generate(
        &self,
        inputs: &[&ImageBuffer<2>],
        output: &mut BufferViewMut<'_, 2>,
        _thread_index: usize,
    ) -> anyhow::Result<()> {
        if output.region().overlaps(&self.poison) {
            bail!("poisoned pixels requested in {}", output.region());
        }
        output.copy_from(inputs[0]);
        Ok(())
    }
}
