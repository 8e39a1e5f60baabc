//! Axis-aligned integer hyper-rectangles.
//!
//! A [`Region`] is an `index` (first pixel, signed) plus a `size` (pixel count,
//! unsigned) per dimension. Dimension 0 varies fastest in every buffer laid out
//! over a region; dimension `D - 1` is the outermost (slowest) one.

#[cfg(test)]
mod tests;

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Region<const D: usize> {
    index: [i64; D],
    size: [u64; D],
}

impl<const D: usize> Default for Region<D> {
    fn default() -> Self {
        Self::null()
    }
}

impl<const D: usize> Region<D> {
    pub const fn new(index: [i64; D], size: [u64; D]) -> Self {
        Self { index, size }
    }

    pub const fn from_size(size: [u64; D]) -> Self {
        Self {
            index: [0; D],
            size,
        }
    }

    /// The canonical null region: origin index, zero size.
    pub const fn null() -> Self {
        Self {
            index: [0; D],
            size: [0; D],
        }
    }

    pub fn index(&self) -> [i64; D] {
        self.index
    }

    pub fn size(&self) -> [u64; D] {
        self.size
    }

    pub fn set_index(&mut self, dim: usize, value: i64) {
        self.index[dim] = value;
    }

    pub fn set_size(&mut self, dim: usize, value: u64) {
        self.size[dim] = value;
    }

    /// Exclusive upper bound along `dim`.
    #[inline]
    pub fn end(&self, dim: usize) -> i64 {
        self.index[dim] + self.size[dim] as i64
    }

    pub fn is_null(&self) -> bool {
        self.size.iter().any(|&s| s == 0)
    }

    pub fn number_of_pixels(&self) -> u64 {
        self.size.iter().product()
    }

    /// True when every pixel of `other` lies in `self`.
    pub fn contains(&self, other: &Region<D>) -> bool {
        (0..D).all(|d| other.index[d] >= self.index[d] && other.end(d) <= self.end(d))
    }

    pub fn contains_index(&self, index: &[i64; D]) -> bool {
        (0..D).all(|d| index[d] >= self.index[d] && index[d] < self.end(d))
    }

    /// Intersection of two regions. Disjoint regions yield [`Region::null`].
    pub fn crop(&self, other: &Region<D>) -> Region<D> {
        let mut result = Region::null();
        for d in 0..D {
            let start = self.index[d].max(other.index[d]);
            let end = self.end(d).min(other.end(d));
            if end <= start {
                return Region::null();
            }
            result.index[d] = start;
            result.size[d] = (end - start) as u64;
        }
        result
    }

    /// Smallest region containing both. A null operand contributes nothing.
    pub fn union(&self, other: &Region<D>) -> Region<D> {
        if self.is_null() {
            return *other;
        }
        if other.is_null() {
            return *self;
        }

        let mut result = Region::null();
        for d in 0..D {
            let start = self.index[d].min(other.index[d]);
            let end = self.end(d).max(other.end(d));
            result.index[d] = start;
            result.size[d] = (end - start) as u64;
        }
        result
    }

    /// True when the two regions share at least one pixel.
    pub fn overlaps(&self, other: &Region<D>) -> bool {
        !self.crop(other).is_null()
    }

    /// Grows the region by `radius` on both sides of every dimension. No clipping.
    pub fn pad_by(&self, radius: u64) -> Region<D> {
        self.pad_by_radius([radius; D])
    }

    pub fn pad_by_radius(&self, radius: [u64; D]) -> Region<D> {
        let mut result = *self;
        for d in 0..D {
            result.index[d] -= radius[d] as i64;
            result.size[d] += 2 * radius[d];
        }
        result
    }

    /// Offset of `index` in a buffer laid out over this region, in pixels.
    #[inline]
    pub fn linear_offset(&self, index: &[i64; D]) -> usize {
        debug_assert!(self.contains_index(index), "{index:?} outside {self}");

        let mut offset = 0usize;
        let mut stride = 1usize;
        for d in 0..D {
            offset += (index[d] - self.index[d]) as usize * stride;
            stride *= self.size[d] as usize;
        }
        offset
    }

    /// Pixels in one step along the outermost dimension (one "row" of a strip).
    pub fn outer_stride(&self) -> usize {
        self.size[..D.saturating_sub(1)]
            .iter()
            .map(|&s| s as usize)
            .product()
    }

    /// All pixel indices, dimension 0 fastest.
    pub fn indices(&self) -> RegionIndices<D> {
        RegionIndices {
            region: *self,
            next: (!self.is_null() && D > 0).then_some(self.index),
        }
    }
}

impl<const D: usize> fmt::Display for Region<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index={:?} size={:?}", self.index, self.size)
    }
}

pub struct RegionIndices<const D: usize> {
    region: Region<D>,
    next: Option<[i64; D]>,
}

impl<const D: usize> Iterator for RegionIndices<D> {
    type Item = [i64; D];

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        let mut advanced = current;
        let mut carried_out = true;
        for d in 0..D {
            advanced[d] += 1;
            if advanced[d] < self.region.end(d) {
                carried_out = false;
                break;
            }
            advanced[d] = self.region.index[d];
        }
        self.next = (!carried_out).then_some(advanced);

        Some(current)
    }
}
