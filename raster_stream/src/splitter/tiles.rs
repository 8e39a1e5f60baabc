use super::ram::{estimate_tile_dimension, RamEstimate, DEFAULT_BIAS};
use super::{MemoryLayout, StreamingManager};
use crate::region::Region;

/// Grid of hyper-cubic tiles of edge `edge`, clipped at the region boundary.
///
/// Tiles are enumerated row-major: dimension 0 fastest, outermost dimension slowest.
fn tile_splits<const D: usize>(region: &Region<D>, edge: u64) -> Vec<Region<D>> {
    if edge == 0 || region.is_null() || D == 0 {
        return vec![*region];
    }

    let size = region.size();
    let origin = region.index();
    let counts: [u64; D] = std::array::from_fn(|d| size[d].div_ceil(edge));
    let total: u64 = counts.iter().product();

    (0..total)
        .map(|linear| {
            let mut rest = linear;
            let mut tile = *region;
            for d in 0..D {
                let k = rest % counts[d];
                rest /= counts[d];
                let start = k * edge;
                tile.set_index(d, origin[d] + start as i64);
                tile.set_size(d, edge.min(size[d] - start));
            }
            tile
        })
        .collect()
}

/// Upper bound on a computed tile edge. No region extent comes close.
const MAX_TILE_EDGE: u64 = u32::MAX as u64;

/// Largest integer `e` with `e^D <= area`, at least 1 and at most [`MAX_TILE_EDGE`].
fn hypercube_edge(area: f64, dims: u32) -> u64 {
    if !(area >= 1.0) {
        return 1;
    }

    let fits = |e: u64| -> bool {
        (e as u128)
            .checked_pow(dims)
            .is_some_and(|volume| volume as f64 <= area)
    };

    let mut edge = (area.powf(1.0 / dims as f64).floor().max(1.0) as u64).min(MAX_TILE_EDGE);
    while edge > 1 && !fits(edge) {
        edge -= 1;
    }
    while edge < MAX_TILE_EDGE && fits(edge + 1) {
        edge += 1;
    }
    edge
}

pub(super) fn edge_for_area(area: f64, dims: usize) -> u64 {
    hypercube_edge(area, dims as u32)
}

/// Tiles with a caller-chosen edge length.
#[derive(Debug, Clone)]
pub struct TiledByDimension<const D: usize> {
    tile_dimension: u64,
    splits: Vec<Region<D>>,
}

impl<const D: usize> TiledByDimension<D> {
    pub fn new(tile_dimension: u64) -> Self {
        Self {
            tile_dimension,
            splits: Vec::new(),
        }
    }

    pub fn tile_dimension(&self) -> u64 {
        self.tile_dimension
    }
}

impl<const D: usize> StreamingManager<D> for TiledByDimension<D> {
    fn prepare_streaming(&mut self, _layout: &MemoryLayout, region: &Region<D>) {
        if self.tile_dimension == 0 {
            tracing::debug!("Zero tile dimension, streaming the whole region at once");
        }
        self.splits = tile_splits(region, self.tile_dimension);

        tracing::debug!(
            tile_dimension = self.tile_dimension,
            splits = self.splits.len(),
            "Tile splitting by dimension"
        );
    }

    fn splits(&self) -> &[Region<D>] {
        &self.splits
    }

    fn name(&self) -> &'static str {
        "tiled_by_dimension"
    }
}

/// Square tiles sized so that roughly `split_count` of them cover the region.
#[derive(Debug, Clone)]
pub struct TiledByCount<const D: usize> {
    split_count: u64,
    splits: Vec<Region<D>>,
}

impl<const D: usize> TiledByCount<D> {
    pub fn new(split_count: u64) -> Self {
        Self {
            split_count,
            splits: Vec::new(),
        }
    }
}

impl<const D: usize> StreamingManager<D> for TiledByCount<D> {
    fn prepare_streaming(&mut self, _layout: &MemoryLayout, region: &Region<D>) {
        if self.split_count <= 1 || region.is_null() || D == 0 {
            self.splits = vec![*region];
            return;
        }

        let area = region.number_of_pixels() as f64 / self.split_count as f64;
        let edge = edge_for_area(area, D);
        self.splits = tile_splits(region, edge);
    }

    fn splits(&self) -> &[Region<D>] {
        &self.splits
    }

    fn name(&self) -> &'static str {
        "tiled_by_count"
    }
}

/// Tile edge derived from a RAM budget and the pipeline memory footprint.
#[derive(Debug, Clone)]
pub struct RamDrivenTiled<const D: usize> {
    available_ram_mb: u64,
    bias: f64,
    splits: Vec<Region<D>>,
}

impl<const D: usize> RamDrivenTiled<D> {
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
}

impl<const D: usize> StreamingManager<D> for RamDrivenTiled<D> {
    fn prepare_streaming(&mut self, layout: &MemoryLayout, region: &Region<D>) {
        let estimate = RamEstimate::new(self.available_ram_mb, self.bias);
        self.splits = match estimate_tile_dimension(&estimate, layout, D) {
            Some(edge) => tile_splits(region, edge),
            None => vec![*region],
        };

        tracing::debug!(splits = self.splits.len(), "RAM-driven tile splitting");
    }

    fn splits(&self) -> &[Region<D>] {
        &self.splits
    }

    fn name(&self) -> &'static str {
        "ram_driven_tiled"
    }
}
