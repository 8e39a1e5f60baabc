use anyhow::Context;

use crate::buffer::{BufferViewMut, ImageBuffer};
use crate::pipeline::Filter;
use crate::region::Region;

/// Mean over the `(2 * radius + 1)^D` box around each pixel.
///
/// The box is clipped to the image, so border pixels average fewer samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxMean {
    pub radius: u64,
}

impl BoxMean {
    pub fn new(radius: u64) -> Self {
        Self { radius }
    }
}

impl<const D: usize> Filter<D> for BoxMean {
    fn name(&self) -> &str {
        "box_mean"
    }

    fn compute_requested_region(
        &self,
        _input_index: usize,
        output_requested: &Region<D>,
        input_largest: &Region<D>,
    ) -> Region<D> {
        output_requested.pad_by(self.radius).crop(input_largest)
    }

    fn generate(
        &self,
        inputs: &[&ImageBuffer<D>],
        output: &mut BufferViewMut<'_, D>,
        _thread_index: usize,
    ) -> anyhow::Result<()> {
        let input = inputs.first().context("box_mean needs an input")?;
        let components = input.components();
        let region = *output.region();
        let mut sums = vec![0f32; components];

        for index in region.indices() {
            // the input buffer is the padded request clipped to the image
            let window = Region::new(index, [1; D])
                .pad_by(self.radius)
                .crop(input.region());

            sums.fill(0.0);
            for neighbor in window.indices() {
                for (sum, &value) in sums.iter_mut().zip(input.pixel(&neighbor)) {
                    *sum += value;
                }
            }

            let count = window.number_of_pixels() as f32;
            for (dst, &sum) in output.pixel_mut(&index).iter_mut().zip(&sums) {
                *dst = sum / count;
            }
        }
        Ok(())
    }
}
