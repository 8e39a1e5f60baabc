//! Streams a pipeline's output into a sink one split at a time.
//!
//! Splits run sequentially; the work inside one split is parallel. A failed split
//! stops the loop. Splits committed before it stay in the sink.


use std::time::Instant;

use common::is_debug;

use crate::error::{StreamError, StreamResult};
use crate::pipeline::{ExecutionContext, NodeId, Pipeline};
use crate::region::Region;
use crate::sink::ImageSink;
use crate::splitter::{validate_partition, MemoryLayout, StreamingManager};

/// Splits committed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingProgress {
    /// Committed splits, 1-based.
    pub current: usize,
    pub total: usize,
}

impl StreamingProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

pub type ProgressCallback = Box<dyn FnMut(StreamingProgress) + Send>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamingReport<const D: usize> {
    pub splits: usize,
    pub elapsed_secs: f64,
    pub full_region: Region<D>,
}

pub struct StreamingWriter<const D: usize> {
    manager: Box<dyn StreamingManager<D>>,
    progress: Option<ProgressCallback>,
}

impl<const D: usize> StreamingWriter<D> {
    pub fn new(manager: impl StreamingManager<D> + 'static) -> Self {
        Self::from_boxed(Box::new(manager))
    }

    pub fn from_boxed(manager: Box<dyn StreamingManager<D>>) -> Self {
        Self {
            manager,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: impl FnMut(StreamingProgress) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn manager(&self) -> &dyn StreamingManager<D> {
        self.manager.as_ref()
    }

    /// Streams the terminal's whole largest possible region.
    pub fn write<S: ImageSink<D> + ?Sized>(
        &mut self,
        pipeline: &mut Pipeline<D>,
        terminal: NodeId,
        sink: &mut S,
        ctx: &ExecutionContext,
    ) -> StreamResult<StreamingReport<D>> {
        self.stream(pipeline, terminal, None, sink, ctx)
    }

    /// Streams `full`, which must lie inside the terminal's largest possible region.
    pub fn write_region<S: ImageSink<D> + ?Sized>(
        &mut self,
        pipeline: &mut Pipeline<D>,
        terminal: NodeId,
        full: Region<D>,
        sink: &mut S,
        ctx: &ExecutionContext,
    ) -> StreamResult<StreamingReport<D>> {
        self.stream(pipeline, terminal, Some(full), sink, ctx)
    }

    /// `full == None` streams the largest possible region known after Phase A.
    fn stream<S: ImageSink<D> + ?Sized>(
        &mut self,
        pipeline: &mut Pipeline<D>,
        terminal: NodeId,
        full: Option<Region<D>>,
        sink: &mut S,
        ctx: &ExecutionContext,
    ) -> StreamResult<StreamingReport<D>> {
        let start = Instant::now();

        pipeline.update_output_information(terminal)?;
        let info = pipeline.output_information(terminal)?;
        let full = full.unwrap_or(info.largest_possible_region);
        let layout = MemoryLayout::new(
            info.components,
            std::mem::size_of::<f32>(),
            pipeline.stage_count(terminal)?,
        );

        self.manager.prepare_streaming(&layout, &full);
        let total = self.manager.number_of_splits();

        if is_debug() {
            if let Err(err) = validate_partition(&full, self.manager.splits()) {
                panic!("{} broke the split invariant: {err}", self.manager.name());
            }
        }

        tracing::info!(
            node = %terminal,
            full = %full,
            splits = total,
            policy = self.manager.name(),
            "Streaming started"
        );

        sink.begin(&full, info.components)?;

        for split_index in 0..total {
            let split = self.manager.split(split_index);

            if let Err(err) = Self::commit_split(pipeline, terminal, split, sink, ctx) {
                tracing::warn!(
                    split_index,
                    committed = split_index,
                    error = %err,
                    "Streaming aborted"
                );
                pipeline.reset_pipeline(terminal)?;

                return Err(StreamError::StreamingAborted {
                    split_index,
                    committed: split_index,
                    source: Box::new(err),
                });
            }

            tracing::debug!(split_index, split = %split, "Split committed");

            if let Some(callback) = self.progress.as_mut() {
                callback(StreamingProgress {
                    current: split_index + 1,
                    total,
                });
            }
        }

        sink.finish()?;

        let report = StreamingReport {
            splits: total,
            elapsed_secs: start.elapsed().as_secs_f64(),
            full_region: full,
        };

        tracing::info!(
            splits = report.splits,
            elapsed_secs = report.elapsed_secs,
            "Streaming finished"
        );

        Ok(report)
    }

    fn commit_split<S: ImageSink<D> + ?Sized>(
        pipeline: &mut Pipeline<D>,
        terminal: NodeId,
        split: Region<D>,
        sink: &mut S,
        ctx: &ExecutionContext,
    ) -> StreamResult<()> {
        pipeline.set_requested_region(terminal, split)?;
        pipeline.update(terminal, ctx)?;
        sink.write(&split, pipeline.output(terminal)?)?;
        Ok(())
    }
}
