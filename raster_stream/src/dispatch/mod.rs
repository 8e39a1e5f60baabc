//! Fork-join execution of one filter over one requested region.
//!
//! The region is cut into at most `width` strips along the outermost dimension.
//! Strip `k` always runs with thread index `k`, so per-thread state indexed by it
//! is never shared between two concurrent strips.

#[cfg(test)]
mod tests;

use rayon::prelude::*;

use crate::buffer::{BufferViewMut, ImageBuffer};
use crate::error::StreamResult;
use crate::pipeline::Filter;
use crate::splitter::strips_along;

pub struct ThreadedDispatch {
    pool: rayon::ThreadPool,
    width: usize,
}

impl ThreadedDispatch {
    /// `width == 0` uses rayon's default thread count.
    pub fn new(width: usize) -> StreamResult<Self> {
        let width = match width {
            0 => rayon::current_num_threads(),
            width => width,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(|i| format!("raster-worker-{i}"))
            .build()?;

        Ok(Self { pool, width })
    }

    /// Number of per-thread slots a region can be split into.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Runs `filter.generate` over every strip of `output` and joins. The error of
    /// the lowest failing strip is returned.
    pub fn run<const D: usize>(
        &self,
        filter: &dyn Filter<D>,
        inputs: &[&ImageBuffer<D>],
        output: &mut ImageBuffer<D>,
    ) -> anyhow::Result<()> {
        let region = *output.region();
        if region.is_null() {
            return Ok(());
        }

        if D == 0 || self.width == 1 {
            return filter.generate(inputs, &mut output.view_mut(), 0);
        }

        let strips = strips_along(&region, D.saturating_sub(1), self.width as u64);
        let mut views = output.view_mut().split_outermost(&strips);
        if let [view] = views.as_mut_slice() {
            return filter.generate(inputs, view, 0);
        }

        let results: Vec<anyhow::Result<()>> = self.pool.install(|| {
            views
                .into_par_iter()
                .enumerate()
                .map(|(thread_index, mut view)| filter.generate(inputs, &mut view, thread_index))
                .collect()
        });

        results.into_iter().collect()
    }
}
