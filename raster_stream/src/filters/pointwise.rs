use anyhow::{bail, Context};

use crate::buffer::{BufferViewMut, ImageBuffer};
use crate::pipeline::{Filter, OutputInformation};

/// `(value + shift) * scale` on every sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftScale {
    pub shift: f32,
    pub scale: f32,
}

impl ShiftScale {
    pub fn new(shift: f32, scale: f32) -> Self {
        Self { shift, scale }
    }
}

impl Default for ShiftScale {
    fn default() -> Self {
        Self {
            shift: 0.0,
            scale: 1.0,
        }
    }
}

impl<const D: usize> Filter<D> for ShiftScale {
    fn name(&self) -> &str {
        "shift_scale"
    }

    fn generate(
        &self,
        inputs: &[&ImageBuffer<D>],
        output: &mut BufferViewMut<'_, D>,
        _thread_index: usize,
    ) -> anyhow::Result<()> {
        let input = inputs.first().context("shift_scale needs an input")?;
        let region = *output.region();

        for index in region.indices() {
            let src = input.pixel(&index);
            for (dst, &value) in output.pixel_mut(&index).iter_mut().zip(src) {
                *dst = (value + self.shift) * self.scale;
            }
        }
        Ok(())
    }
}

/// Sample-wise sum of two images with identical geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl<const D: usize> Filter<D> for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn output_information(
        &self,
        inputs: &[OutputInformation<D>],
    ) -> anyhow::Result<OutputInformation<D>> {
        let [a, b] = inputs else {
            bail!("sum needs exactly two inputs, got {}", inputs.len());
        };
        if a != b {
            bail!(
                "sum inputs differ: {} x {} vs {} x {}",
                a.largest_possible_region,
                a.components,
                b.largest_possible_region,
                b.components
            );
        }
        Ok(*a)
    }

    fn generate(
        &self,
        inputs: &[&ImageBuffer<D>],
        output: &mut BufferViewMut<'_, D>,
        _thread_index: usize,
    ) -> anyhow::Result<()> {
        let [a, b] = inputs else {
            bail!("sum needs exactly two inputs, got {}", inputs.len());
        };
        let region = *output.region();

        for index in region.indices() {
            let (pa, pb) = (a.pixel(&index), b.pixel(&index));
            for ((dst, &va), &vb) in output.pixel_mut(&index).iter_mut().zip(pa).zip(pb) {
                *dst = va + vb;
            }
        }
        Ok(())
    }
}
