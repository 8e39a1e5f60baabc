//! Destinations for committed splits.

mod raw_file;


use std::io;

pub use raw_file::{read_raw_image, RawFileSink};

use crate::buffer::ImageBuffer;
use crate::region::Region;

/// Receives the pixels of each committed split, in split order.
pub trait ImageSink<const D: usize> {
    /// Called once before the first split with the full output region.
    fn begin(&mut self, full: &Region<D>, components: usize) -> io::Result<()>;

    /// Stores `region` out of `buffer`. `buffer` covers at least `region`.
    fn write(&mut self, region: &Region<D>, buffer: &ImageBuffer<D>) -> io::Result<()>;

    /// Called once after the last split. Not called when streaming aborts.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Assembles the whole image in memory and records every committed region.
#[derive(Debug, Default)]
pub struct MemorySink<const D: usize> {
    image: ImageBuffer<D>,
    committed: Vec<Region<D>>,
}

impl<const D: usize> MemorySink<D> {
    pub fn new() -> Self {
        Self {
            image: ImageBuffer::default(),
            committed: Vec::new(),
        }
    }

    pub fn image(&self) -> &ImageBuffer<D> {
        &self.image
    }

    pub fn into_image(self) -> ImageBuffer<D> {
        self.image
    }

    /// Regions in commit order.
    pub fn committed(&self) -> &[Region<D>] {
        &self.committed
    }
}

impl<const D: usize> ImageSink<D> for MemorySink<D> {
    fn begin(&mut self, full: &Region<D>, components: usize) -> io::Result<()> {
        self.image = ImageBuffer::new(*full, components);
        self.committed.clear();
        Ok(())
    }

    fn write(&mut self, region: &Region<D>, buffer: &ImageBuffer<D>) -> io::Result<()> {
        if buffer.region() == region {
            self.image.copy_from(buffer);
        } else {
            self.image.copy_from(&buffer.crop_to(region));
        }
        self.committed.push(*region);
        Ok(())
    }
}

/// Discards pixels. Counts splits for diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink {
    writes: usize,
}

impl NullSink {
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl<const D: usize> ImageSink<D> for NullSink {
    fn begin(&mut self, _full: &Region<D>, _components: usize) -> io::Result<()> {
        self.writes = 0;
        Ok(())
    }

    fn write(&mut self, _region: &Region<D>, _buffer: &ImageBuffer<D>) -> io::Result<()> {
        self.writes += 1;
        Ok(())
    }
}
