use crate::buffer::{BufferViewMut, ImageBuffer};
use crate::pipeline::{Filter, OutputInformation};
use crate::region::Region;

type PixelFn<const D: usize> = Box<dyn Fn(&[i64; D], &mut [f32]) + Send + Sync>;

/// Source computing each pixel from its index.
pub struct FnSource<const D: usize> {
    largest: Region<D>,
    components: usize,
    pixel: PixelFn<D>,
}

impl<const D: usize> FnSource<D> {
    pub fn new(
        largest: Region<D>,
        components: usize,
        pixel: impl Fn(&[i64; D], &mut [f32]) + Send + Sync + 'static,
    ) -> Self {
        Self {
            largest,
            components,
            pixel: Box::new(pixel),
        }
    }

    pub fn largest_possible_region(&self) -> Region<D> {
        self.largest
    }

    pub fn set_largest_possible_region(&mut self, largest: Region<D>) {
        self.largest = largest;
    }
}

impl<const D: usize> Filter<D> for FnSource<D> {
    fn name(&self) -> &str {
        "fn_source"
    }

    fn output_information(
        &self,
        _inputs: &[OutputInformation<D>],
    ) -> anyhow::Result<OutputInformation<D>> {
        Ok(OutputInformation::new(self.largest, self.components))
    }

    fn generate(
        &self,
        _inputs: &[&ImageBuffer<D>],
        output: &mut BufferViewMut<'_, D>,
        _thread_index: usize,
    ) -> anyhow::Result<()> {
        let region = *output.region();
        for index in region.indices() {
            (self.pixel)(&index, output.pixel_mut(&index));
        }
        Ok(())
    }
}

/// Source serving an image already in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferSource<const D: usize> {
    image: ImageBuffer<D>,
}

impl<const D: usize> BufferSource<D> {
    pub fn new(image: ImageBuffer<D>) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &ImageBuffer<D> {
        &self.image
    }

    pub fn set_image(&mut self, image: ImageBuffer<D>) {
        self.image = image;
    }
}

impl<const D: usize> Filter<D> for BufferSource<D> {
    fn name(&self) -> &str {
        "buffer_source"
    }

    fn output_information(
        &self,
        _inputs: &[OutputInformation<D>],
    ) -> anyhow::Result<OutputInformation<D>> {
        Ok(OutputInformation::new(
            *self.image.region(),
            self.image.components(),
        ))
    }

    fn generate(
        &self,
        _inputs: &[&ImageBuffer<D>],
        output: &mut BufferViewMut<'_, D>,
        _thread_index: usize,
    ) -> anyhow::Result<()> {
        output.copy_from(&self.image);
        Ok(())
    }
}
