//! Memory-footprint estimation shared by the RAM-driven policies.
//!
//! ```text
//! bytes_per_pixel = stages * components * component_bytes * bias
//! rows_per_strip  = floor(budget / (line_pixels * bytes_per_pixel))
//! tile_edge       = floor(sqrt(budget / bytes_per_pixel))      (2-D)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use super::tiles::edge_for_area;
use super::MemoryLayout;

/// Multiplier on the estimated footprint, for filters holding extra copies.
pub const DEFAULT_BIAS: f64 = 1.0;

/// Share of the system's available memory used when no default is configured.
pub const SYSTEM_MEMORY_PERCENT: u64 = 75;

const BYTES_PER_MB: u64 = 1024 * 1024;

// 0 = unset, ask the system
static DEFAULT_AVAILABLE_RAM_MB: AtomicU64 = AtomicU64::new(0);

/// Sets the process-wide RAM budget used when a policy is given 0 MB.
pub fn set_default_available_ram_mb(mb: u64) {
    DEFAULT_AVAILABLE_RAM_MB.store(mb, Ordering::Relaxed);
}

/// The process-wide RAM budget in MB, falling back to a share of system memory.
pub fn default_available_ram_mb() -> u64 {
    match DEFAULT_AVAILABLE_RAM_MB.load(Ordering::Relaxed) {
        0 => system_available_ram_mb(),
        mb => mb,
    }
}

fn system_available_ram_mb() -> u64 {
    use sysinfo::System;

    let mut sys = System::new();
    sys.refresh_memory();
    let mb = sys.available_memory() * SYSTEM_MEMORY_PERCENT / 100 / BYTES_PER_MB;

    tracing::debug!(available_mb = mb, "Queried system memory for streaming budget");
    mb
}

/// RAM budget and bias of one RAM-driven policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RamEstimate {
    pub available_ram_mb: u64,
    pub bias: f64,
}

impl RamEstimate {
    pub fn new(available_ram_mb: u64, bias: f64) -> Self {
        Self {
            available_ram_mb,
            bias,
        }
    }

    pub fn budget_bytes(&self) -> u64 {
        let mb = match self.available_ram_mb {
            0 => default_available_ram_mb(),
            mb => mb,
        };
        mb.saturating_mul(BYTES_PER_MB)
    }

    fn bytes_per_pixel(&self, layout: &MemoryLayout) -> f64 {
        layout.bytes_per_pixel() as f64 * self.bias
    }
}

/// Lines per strip fitting the budget, or `None` when the inputs are degenerate
/// (no budget, zero-sized pixels, non-positive bias).
pub fn estimate_rows_per_strip(
    estimate: &RamEstimate,
    layout: &MemoryLayout,
    line_pixels: u64,
) -> Option<u64> {
    let budget = estimate.budget_bytes();
    let bytes_per_line = estimate.bytes_per_pixel(layout) * line_pixels as f64;

    if budget == 0 || !(bytes_per_line > 0.0) {
        tracing::debug!(
            budget,
            bytes_per_line,
            "Degenerate RAM estimate, streaming the whole region at once"
        );
        return None;
    }

    let rows = (budget as f64 / bytes_per_line).floor() as u64;

    tracing::info!(
        budget_mb = budget / BYTES_PER_MB,
        bytes_per_line,
        rows_per_strip = rows.max(1),
        "RAM-driven strip height computed"
    );

    Some(rows.max(1))
}

/// Tile edge fitting the budget for a `dims`-dimensional hyper-cube, or `None`
/// when the inputs are degenerate.
pub fn estimate_tile_dimension(
    estimate: &RamEstimate,
    layout: &MemoryLayout,
    dims: usize,
) -> Option<u64> {
    let budget = estimate.budget_bytes();
    let bytes_per_pixel = estimate.bytes_per_pixel(layout);

    if budget == 0 || !(bytes_per_pixel > 0.0) || dims == 0 {
        tracing::debug!(
            budget,
            bytes_per_pixel,
            "Degenerate RAM estimate, streaming the whole region at once"
        );
        return None;
    }

    let edge = edge_for_area(budget as f64 / bytes_per_pixel, dims);

    tracing::info!(
        budget_mb = budget / BYTES_PER_MB,
        bytes_per_pixel,
        tile_dimension = edge,
        "RAM-driven tile dimension computed"
    );

    Some(edge)
}
