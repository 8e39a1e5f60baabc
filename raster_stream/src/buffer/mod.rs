//! Pixel storage laid out over a [`Region`].


use crate::region::Region;

/// Multi-component `f32` pixels covering `region`, dimension 0 fastest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageBuffer<const D: usize> {
    region: Region<D>,
    components: usize,
    data: Vec<f32>,
}

impl<const D: usize> ImageBuffer<D> {
    pub fn new(region: Region<D>, components: usize) -> Self {
        Self::filled(region, components, 0.0)
    }

    pub fn filled(region: Region<D>, components: usize, value: f32) -> Self {
        let len = region.number_of_pixels() as usize * components;
        Self {
            region,
            components,
            data: vec![value; len],
        }
    }

    pub fn from_vec(region: Region<D>, components: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            region.number_of_pixels() as usize * components,
            "buffer length does not match {region} x {components}"
        );
        Self {
            region,
            components,
            data,
        }
    }

    pub fn region(&self) -> &Region<D> {
        &self.region
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pixel(&self, index: &[i64; D]) -> &[f32] {
        let start = self.region.linear_offset(index) * self.components;
        &self.data[start..start + self.components]
    }

    pub fn pixel_mut(&mut self, index: &[i64; D]) -> &mut [f32] {
        let start = self.region.linear_offset(index) * self.components;
        &mut self.data[start..start + self.components]
    }

    /// Copies the pixels of `other` that fall inside this buffer's region.
    pub fn copy_from(&mut self, other: &ImageBuffer<D>) {
        assert_eq!(self.components, other.components);

        let overlap = self.region.crop(&other.region);
        for index in overlap.indices() {
            let src = other.pixel(&index);
            self.pixel_mut(&index).copy_from_slice(src);
        }
    }

    /// New buffer holding the part of this one inside `region`.
    pub fn crop_to(&self, region: &Region<D>) -> ImageBuffer<D> {
        assert!(
            self.region.contains(region),
            "crop {region} outside buffered {}",
            self.region
        );

        let mut cropped = ImageBuffer::new(*region, self.components);
        cropped.copy_from(self);
        cropped
    }

    /// Mutable view over the whole buffer.
    pub fn view_mut(&mut self) -> BufferViewMut<'_, D> {
        BufferViewMut {
            region: self.region,
            components: self.components,
            data: &mut self.data,
        }
    }
}

/// Mutable window over a contiguous run of an [`ImageBuffer`]'s storage.
///
/// The window's region differs from the parent only along the outermost dimension,
/// which keeps its pixels contiguous.
#[derive(Debug)]
pub struct BufferViewMut<'a, const D: usize> {
    region: Region<D>,
    components: usize,
    data: &'a mut [f32],
}

impl<'a, const D: usize> BufferViewMut<'a, D> {
    pub(crate) fn new(region: Region<D>, components: usize, data: &'a mut [f32]) -> Self {
        debug_assert_eq!(
            data.len(),
            region.number_of_pixels() as usize * components
        );
        Self {
            region,
            components,
            data,
        }
    }

    pub fn region(&self) -> &Region<D> {
        &self.region
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn data(&self) -> &[f32] {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut *self.data
    }

    pub fn pixel(&self, index: &[i64; D]) -> &[f32] {
        let start = self.region.linear_offset(index) * self.components;
        &self.data[start..start + self.components]
    }

    pub fn pixel_mut(&mut self, index: &[i64; D]) -> &mut [f32] {
        let start = self.region.linear_offset(index) * self.components;
        &mut self.data[start..start + self.components]
    }

    /// Copies the pixels of `other` that fall inside this view.
    pub fn copy_from(&mut self, other: &ImageBuffer<D>) {
        assert_eq!(self.components, other.components());

        let overlap = self.region.crop(other.region());
        for index in overlap.indices() {
            let src = other.pixel(&index);
            self.pixel_mut(&index).copy_from_slice(src);
        }
    }

    /// Splits along the outermost dimension into consecutive views.
    ///
    /// `parts` are outermost-dimension sub-regions of this view, in order and
    /// covering it exactly.
    pub(crate) fn split_outermost(self, parts: &[Region<D>]) -> Vec<BufferViewMut<'a, D>> {
        let components = self.components;
        let mut rest: &'a mut [f32] = self.data;
        let mut views = Vec::with_capacity(parts.len());

        for part in parts {
            let len = part.number_of_pixels() as usize * components;
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
            views.push(BufferViewMut::new(*part, components, head));
            rest = tail;
        }
        assert!(rest.is_empty(), "parts do not cover the view");

        views
    }
}
