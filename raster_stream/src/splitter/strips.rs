use super::ram::{estimate_rows_per_strip, RamEstimate, DEFAULT_BIAS};
use super::{MemoryLayout, StreamingManager};
use crate::region::Region;

/// Dimension strips are cut along: the outermost one with more than one line.
pub(crate) fn split_axis<const D: usize>(region: &Region<D>) -> usize {
    let size = region.size();
    (0..D).rev().find(|&d| size[d] > 1).unwrap_or(D.saturating_sub(1))
}

/// Cuts `region` into at most `requested` strips along `axis`.
///
/// Strips are `ceil(lines / requested)` lines high; the last one takes what is left,
/// so fewer than `requested` strips come back when the lines do not divide evenly.
pub(crate) fn strips_along<const D: usize>(
    region: &Region<D>,
    axis: usize,
    requested: u64,
) -> Vec<Region<D>> {
    let lines = region.size()[axis];
    if lines == 0 || region.is_null() {
        return vec![*region];
    }

    let requested = requested.clamp(1, lines);
    let lines_per_strip = lines.div_ceil(requested);
    let count = lines.div_ceil(lines_per_strip);
    let origin = region.index()[axis];

    (0..count)
        .map(|i| {
            let start = i * lines_per_strip;
            let mut strip = *region;
            strip.set_index(axis, origin + start as i64);
            strip.set_size(axis, lines_per_strip.min(lines - start));
            strip
        })
        .collect()
}

fn strip_splits<const D: usize>(region: &Region<D>, requested: u64) -> Vec<Region<D>> {
    if D == 0 {
        return vec![*region];
    }
    strips_along(region, split_axis(region), requested)
}

/// Fixed number of strips along the outermost dimension.
#[derive(Debug, Clone)]
pub struct StripedByCount<const D: usize> {
    split_count: u64,
    splits: Vec<Region<D>>,
}

impl<const D: usize> StripedByCount<D> {
    pub fn new(split_count: u64) -> Self {
        Self {
            split_count,
            splits: Vec::new(),
        }
    }

    pub fn split_count(&self) -> u64 {
        self.split_count
    }
}

impl<const D: usize> StreamingManager<D> for StripedByCount<D> {
    fn prepare_streaming(&mut self, _layout: &MemoryLayout, region: &Region<D>) {
        self.splits = strip_splits(region, self.split_count);

        tracing::debug!(
            requested = self.split_count,
            splits = self.splits.len(),
            "Strip splitting by count"
        );
    }

    fn splits(&self) -> &[Region<D>] {
        &self.splits
    }

    fn name(&self) -> &'static str {
        "striped_by_count"
    }
}

/// Strips of a fixed number of lines; the last strip may be shorter.
#[derive(Debug, Clone)]
pub struct StripedByLines<const D: usize> {
    lines_per_strip: u64,
    splits: Vec<Region<D>>,
}

impl<const D: usize> StripedByLines<D> {
    pub fn new(lines_per_strip: u64) -> Self {
        Self {
            lines_per_strip,
            splits: Vec::new(),
        }
    }
}

impl<const D: usize> StreamingManager<D> for StripedByLines<D> {
    fn prepare_streaming(&mut self, _layout: &MemoryLayout, region: &Region<D>) {
        if D == 0 || self.lines_per_strip == 0 {
            tracing::debug!("Zero lines per strip, streaming the whole region at once");
            self.splits = vec![*region];
            return;
        }

        let lines = region.size()[split_axis(region)];
        self.splits = strip_splits(region, lines.div_ceil(self.lines_per_strip));
    }

    fn splits(&self) -> &[Region<D>] {
        &self.splits
    }

    fn name(&self) -> &'static str {
        "striped_by_lines"
    }
}

/// Strip height derived from a RAM budget and the pipeline memory footprint.
#[derive(Debug, Clone)]
pub struct RamDrivenStriped<const D: usize> {
    available_ram_mb: u64,
    bias: f64,
    splits: Vec<Region<D>>,
}

impl<const D: usize> RamDrivenStriped<D> {
    /// `available_ram_mb == 0` reads the process default at prepare time.
    pub fn new(available_ram_mb: u64) -> Self {
        Self {
            available_ram_mb,
            bias: DEFAULT_BIAS,
            splits: Vec::new(),
        }
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl<const D: usize> StreamingManager<D> for RamDrivenStriped<D> {
    fn prepare_streaming(&mut self, layout: &MemoryLayout, region: &Region<D>) {
        if D == 0 || region.is_null() {
            self.splits = vec![*region];
            return;
        }

        let axis = split_axis(region);
        let lines = region.size()[axis];
        let line_pixels = region.number_of_pixels() / lines;

        self.splits = match estimate_rows_per_strip(
            &RamEstimate::new(self.available_ram_mb, self.bias),
            layout,
            line_pixels,
        ) {
            Some(rows) => {
                let count = lines.div_ceil(rows).clamp(1, lines);
                strips_along(region, axis, count)
            }
            None => vec![*region],
        };

        tracing::debug!(splits = self.splits.len(), "RAM-driven strip splitting");
    }

    fn splits(&self) -> &[Region<D>] {
        &self.splits
    }

    fn name(&self) -> &'static str {
        "ram_driven_striped"
    }
}
