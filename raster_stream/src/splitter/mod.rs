//! Streaming managers: partition a full region into an ordered list of splits.
//!
//! ```text
//!   strips (outermost axis)        tiles (row-major grid)
//!   ┌──────────────────┐           ┌─────┬─────┬───┐
//!   │ split 0          │           │  0  │  1  │ 2 │
//!   ├──────────────────┤           ├─────┼─────┼───┤
//!   │ split 1          │           │  3  │  4  │ 5 │
//!   ├──────────────────┤           ├─────┼─────┼───┤
//!   │ split 2 (rest)   │           │  6  │  7  │ 8 │
//!   └──────────────────┘           └─────┴─────┴───┘
//! ```
//!
//! Every policy yields splits that are pairwise disjoint and cover the full region
//! exactly, with at least one split even for degenerate budgets.

mod ram;
mod strips;
mod tiles;


use serde::{Deserialize, Serialize};

pub use ram::{
    default_available_ram_mb, estimate_rows_per_strip, estimate_tile_dimension,
    set_default_available_ram_mb, RamEstimate, DEFAULT_BIAS, SYSTEM_MEMORY_PERCENT,
};
pub use strips::{RamDrivenStriped, StripedByCount, StripedByLines};
pub use tiles::{RamDrivenTiled, TiledByCount, TiledByDimension};

pub(crate) use strips::{split_axis, strips_along};

use crate::error::{StreamError, StreamResult};
use crate::region::Region;

/// Per-pixel memory footprint inputs for the RAM-driven policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Components per pixel.
    pub components: usize,
    /// Bytes per component.
    pub component_bytes: usize,
    /// Number of pipeline stages holding a buffer of the split at once.
    pub stages: usize,
}

impl MemoryLayout {
    pub fn new(components: usize, component_bytes: usize, stages: usize) -> Self {
        Self {
            components,
            component_bytes,
            stages,
        }
    }

    pub fn bytes_per_pixel(&self) -> u64 {
        (self.stages * self.components * self.component_bytes) as u64
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            components: 1,
            component_bytes: std::mem::size_of::<f32>(),
            stages: 1,
        }
    }
}

/// Computes splits once per streaming write, then serves them by ordinal.
pub trait StreamingManager<const D: usize>: Send {
    /// Computes the split list for `region`. Must be called before the getters.
    fn prepare_streaming(&mut self, layout: &MemoryLayout, region: &Region<D>);

    fn number_of_splits(&self) -> usize {
        self.splits().len()
    }

    /// The `i`-th split. Panics when `i >= number_of_splits()`.
    fn split(&self, i: usize) -> Region<D> {
        self.splits()[i]
    }

    fn splits(&self) -> &[Region<D>];

    fn name(&self) -> &'static str;
}

/// Configuration-level choice of policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, strum_macros::Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StreamingMode {
    /// Fixed number of strips.
    Strips { count: u64 },
    /// Fixed strip height in lines.
    Lines { per_strip: u64 },
    /// Strip height derived from a RAM budget (0 = process default).
    RamStrips { ram_mb: u64 },
    /// Square tiles of a fixed edge length.
    Tiles { dimension: u64 },
    /// Square tiles sized to produce about `count` splits.
    TileCount { count: u64 },
    /// Tile edge derived from a RAM budget (0 = process default).
    RamTiles { ram_mb: u64 },
}

impl Default for StreamingMode {
    fn default() -> Self {
        StreamingMode::RamStrips { ram_mb: 0 }
    }
}

impl StreamingMode {
    pub fn build<const D: usize>(&self, bias: f64) -> Box<dyn StreamingManager<D>> {
        match *self {
            StreamingMode::Strips { count } => Box::new(StripedByCount::new(count)),
            StreamingMode::Lines { per_strip } => Box::new(StripedByLines::new(per_strip)),
            StreamingMode::RamStrips { ram_mb } => {
                Box::new(RamDrivenStriped::new(ram_mb).with_bias(bias))
            }
            StreamingMode::Tiles { dimension } => Box::new(TiledByDimension::new(dimension)),
            StreamingMode::TileCount { count } => Box::new(TiledByCount::new(count)),
            StreamingMode::RamTiles { ram_mb } => {
                Box::new(RamDrivenTiled::new(ram_mb).with_bias(bias))
            }
        }
    }
}

/// Checks that `splits` are inside `full`, pairwise disjoint and cover it exactly.
pub fn validate_partition<const D: usize>(
    full: &Region<D>,
    splits: &[Region<D>],
) -> StreamResult<()> {
    if splits.is_empty() {
        return Err(StreamError::SplitInvariant {
            reason: "no splits".to_string(),
        });
    }

    if full.is_null() {
        return if splits.len() == 1 && splits[0] == *full {
            Ok(())
        } else {
            Err(StreamError::SplitInvariant {
                reason: format!("null region {full} must map to itself"),
            })
        };
    }

    let mut covered = 0u64;
    for (i, split) in splits.iter().enumerate() {
        if split.is_null() {
            return Err(StreamError::SplitInvariant {
                reason: format!("split {i} is null"),
            });
        }
        if !full.contains(split) {
            return Err(StreamError::SplitInvariant {
                reason: format!("split {i} ({split}) leaves {full}"),
            });
        }
        covered += split.number_of_pixels();
    }

    // Disjoint splits inside `full` with matching volume cover it exactly.
    for (i, a) in splits.iter().enumerate() {
        for (j, b) in splits.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                return Err(StreamError::SplitInvariant {
                    reason: format!("splits {i} ({a}) and {j} ({b}) overlap"),
                });
            }
        }
    }

    if covered != full.number_of_pixels() {
        return Err(StreamError::SplitInvariant {
            reason: format!(
                "splits cover {covered} pixels, full region has {}",
                full.number_of_pixels()
            ),
        });
    }

    Ok(())
}
