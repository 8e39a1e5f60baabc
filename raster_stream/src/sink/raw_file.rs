use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::ImageSink;
use crate::buffer::ImageBuffer;
use crate::region::Region;

const SAMPLE_BYTES: u64 = std::mem::size_of::<f32>() as u64;

/// Headerless file of little-endian `f32` samples laid out over the full region,
/// dimension 0 fastest, components interleaved.
///
/// Each split is written in place, one contiguous dimension-0 run at a time, so an
/// aborted stream leaves the committed splits on disk and zeros elsewhere.
#[derive(Debug)]
pub struct RawFileSink<const D: usize> {
    path: PathBuf,
    file: Option<File>,
    full: Region<D>,
    components: usize,
}

impl<const D: usize> RawFileSink<D> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            full: Region::null(),
            components: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("raw file sink written before begin"))
    }
}

fn le_bytes(samples: &[f32]) -> Cow<'_, [u8]> {
    if cfg!(target_endian = "little") {
        Cow::Borrowed(bytemuck::cast_slice(samples))
    } else {
        Cow::Owned(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
    }
}

/// First pixel of every dimension-0 run of `region`.
fn run_starts<const D: usize>(region: &Region<D>) -> impl Iterator<Item = [i64; D]> {
    let mut starts = *region;
    if D > 0 {
        starts.set_size(0, 1);
    }
    starts.indices()
}

impl<const D: usize> ImageSink<D> for RawFileSink<D> {
    fn begin(&mut self, full: &Region<D>, components: usize) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        file.set_len(full.number_of_pixels() * components as u64 * SAMPLE_BYTES)?;

        tracing::debug!(path = %self.path.display(), full = %full, components, "Raw file sink opened");

        self.file = Some(file);
        self.full = *full;
        self.components = components;
        Ok(())
    }

    fn write(&mut self, region: &Region<D>, buffer: &ImageBuffer<D>) -> io::Result<()> {
        if !self.full.contains(region) || !buffer.region().contains(region) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("region {region} is outside the sink or the buffer"),
            ));
        }
        if buffer.components() != self.components {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "buffer has {} components, sink expects {}",
                    buffer.components(),
                    self.components
                ),
            ));
        }

        let full = self.full;
        let components = self.components;
        let run_pixels = if D > 0 { region.size()[0] as usize } else { 1 };
        let run = run_pixels * components;
        let file = self.file()?;

        for start in run_starts(region) {
            let src = buffer.region().linear_offset(&start) * components;
            let dst = full.linear_offset(&start) as u64 * components as u64 * SAMPLE_BYTES;

            file.seek(SeekFrom::Start(dst))?;
            file.write_all(&le_bytes(&buffer.data()[src..src + run]))?;
        }

        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }
}

/// Reads a file written by [`RawFileSink`] back into memory.
pub fn read_raw_image<const D: usize>(
    path: impl AsRef<Path>,
    full: Region<D>,
    components: usize,
) -> io::Result<ImageBuffer<D>> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    let expected = full.number_of_pixels() * components as u64 * SAMPLE_BYTES;
    if bytes.len() as u64 != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected {expected} bytes, found {}", bytes.len()),
        ));
    }

    let samples = bytes
        .chunks_exact(SAMPLE_BYTES as usize)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(ImageBuffer::from_vec(full, components, samples))
}
