use std::any::Any;

use anyhow::anyhow;

use crate::buffer::{BufferViewMut, ImageBuffer};
use crate::region::Region;

/// Structural metadata a node publishes in Phase A, before any pixel is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputInformation<const D: usize> {
    pub largest_possible_region: Region<D>,
    pub components: usize,
}

impl<const D: usize> OutputInformation<D> {
    pub fn new(largest_possible_region: Region<D>, components: usize) -> Self {
        Self {
            largest_possible_region,
            components,
        }
    }
}

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Pixel-producing step of a pipeline.
///
/// Only [`Filter::generate`] is required. Sources override
/// [`Filter::output_information`]; neighborhood and geometric filters override
/// [`Filter::compute_requested_region`].
///
/// `generate` runs concurrently on disjoint strips of the output, so it takes `&self`.
/// Anything it accumulates must live behind per-thread slots indexed by `thread_index`.
pub trait Filter<const D: usize>: AsAny + Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Largest possible region and component count of the output. Copies input 0
    /// unless overridden.
    fn output_information(
        &self,
        inputs: &[OutputInformation<D>],
    ) -> anyhow::Result<OutputInformation<D>> {
        inputs
            .first()
            .copied()
            .ok_or_else(|| anyhow!("{} has no input to copy output information from", self.name()))
    }

    /// Region needed from input `input_index` to produce `output_requested`.
    fn compute_requested_region(
        &self,
        _input_index: usize,
        output_requested: &Region<D>,
        _input_largest: &Region<D>,
    ) -> Region<D> {
        *output_requested
    }

    /// Runs once per Phase C execution, before the worker strips are dispatched.
    fn before_generate(&mut self, _requested: &Region<D>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fills `output` (one worker strip of the requested region).
    fn generate(
        &self,
        inputs: &[&ImageBuffer<D>],
        output: &mut BufferViewMut<'_, D>,
        thread_index: usize,
    ) -> anyhow::Result<()>;

    /// Runs once after every strip of the execution joined successfully.
    fn after_generate(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
