use crate::buffer::ImageBuffer;
use crate::region::Region;

use super::Accumulate;

/// Per-component moments and extrema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub count: u64,
    pub sum: Vec<f64>,
    pub sum_of_squares: Vec<f64>,
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

impl Statistics {
    fn with_components(components: usize) -> Self {
        Self {
            count: 0,
            sum: vec![0.0; components],
            sum_of_squares: vec![0.0; components],
            min: vec![f32::INFINITY; components],
            max: vec![f32::NEG_INFINITY; components],
        }
    }

    fn add(&mut self, pixel: &[f32]) {
        self.count += 1;
        for (c, &value) in pixel.iter().enumerate() {
            let v = value as f64;
            self.sum[c] += v;
            self.sum_of_squares[c] += v * v;
            self.min[c] = self.min[c].min(value);
            self.max[c] = self.max[c].max(value);
        }
    }

    fn combine(&mut self, other: &Statistics) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        self.count += other.count;
        for c in 0..self.sum.len() {
            self.sum[c] += other.sum[c];
            self.sum_of_squares[c] += other.sum_of_squares[c];
            self.min[c] = self.min[c].min(other.min[c]);
            self.max[c] = self.max[c].max(other.max[c]);
        }
    }

    pub fn mean(&self) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        self.sum.iter().map(|s| s / n).collect()
    }

    /// Population variance.
    pub fn variance(&self) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        self.sum
            .iter()
            .zip(&self.sum_of_squares)
            .map(|(s, sq)| (sq / n - (s / n) * (s / n)).max(0.0))
            .collect()
    }
}

/// Count, sums, extrema and moments of every component. Order independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelStatistics;

impl<const D: usize> Accumulate<D> for PixelStatistics {
    type Partial = Statistics;
    type Output = Statistics;

    fn name(&self) -> &str {
        "pixel_statistics"
    }

    fn new_partial(&self) -> Statistics {
        Statistics::default()
    }

    fn accumulate(&self, partial: &mut Statistics, input: &ImageBuffer<D>, region: &Region<D>) {
        if partial.count == 0 && partial.sum.len() != input.components() {
            *partial = Statistics::with_components(input.components());
        }
        for index in region.indices() {
            partial.add(input.pixel(&index));
        }
    }

    fn merge(&self, partials: Vec<Statistics>) -> Statistics {
        partials
            .iter()
            .fold(Statistics::default(), |mut merged, partial| {
                merged.combine(partial);
                merged
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample<const D: usize> {
    pub index: [i64; D],
    pub values: Vec<f32>,
}

/// Keeps the pixels whose every coordinate is a multiple of `stride`.
///
/// Samples are appended in visiting order and merged thread by thread, so the
/// merged list follows thread index first, then split order.
#[derive(Debug, Clone, Copy)]
pub struct SampleCollector {
    stride: u64,
}

impl SampleCollector {
    pub fn new(stride: u64) -> Self {
        Self {
            stride: stride.max(1),
        }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub(crate) fn keeps<const D: usize>(&self, index: &[i64; D]) -> bool {
        let stride = self.stride as i64;
        index.iter().all(|&i| i.rem_euclid(stride) == 0)
    }
}

impl<const D: usize> Accumulate<D> for SampleCollector {
    type Partial = Vec<Sample<D>>;
    type Output = Vec<Sample<D>>;

    fn name(&self) -> &str {
        "sample_collector"
    }

    fn new_partial(&self) -> Vec<Sample<D>> {
        Vec::new()
    }

    fn accumulate(&self, partial: &mut Vec<Sample<D>>, input: &ImageBuffer<D>, region: &Region<D>) {
        partial.extend(region.indices().filter(|index| self.keeps(index)).map(|index| Sample {
            index,
            values: input.pixel(&index).to_vec(),
        }));
    }

    fn merge(&self, partials: Vec<Vec<Sample<D>>>) -> Vec<Sample<D>> {
        partials.into_iter().flatten().collect()
    }
}
