//! Streaming settings loadable from YAML or JSON.


use std::path::{Path, PathBuf};

use common::{FileFormat, FileFormatResult};
use serde::{Deserialize, Serialize};

use crate::error::StreamResult;
use crate::pipeline::ExecutionContext;
use crate::splitter::{set_default_available_ram_mb, StreamingManager, StreamingMode, DEFAULT_BIAS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Process-wide RAM budget in MB for RAM-driven policies given 0 MB.
    /// 0 = a share of the system's available memory.
    pub default_available_ram_mb: u64,
    /// Multiplier on the estimated per-pixel footprint.
    pub bias: f64,
    /// Worker pool width. 0 = rayon's default.
    pub worker_threads: usize,
    /// Drop intermediate buffers once consumed.
    pub release_data: bool,
    pub mode: StreamingMode,
    /// Base tracing filter, e.g. `info` or `raster_stream=debug`. `RUST_LOG` wins.
    pub log_level: String,
    /// Directory for rolling log files. Console only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            default_available_ram_mb: 0,
            bias: DEFAULT_BIAS,
            worker_threads: 0,
            release_data: false,
            mode: StreamingMode::default(),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl StreamingConfig {
    /// Small strips, one worker, buffers released. Keeps peak memory low.
    pub fn low_memory() -> Self {
        Self {
            worker_threads: 1,
            release_data: true,
            mode: StreamingMode::Lines { per_strip: 64 },
            ..Self::default()
        }
    }

    /// Format picked from the file extension (`.yaml`, `.yml`, `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> StreamResult<Self> {
        let config: Self = common::file_format::deserialize_file(path.as_ref())?;

        tracing::debug!(path = %path.as_ref().display(), mode = %config.mode, "Loaded streaming config");
        Ok(config)
    }

    pub fn parse(text: &str, format: FileFormat) -> StreamResult<Self> {
        Ok(common::deserialize(text, format)?)
    }

    pub fn serialize(&self, format: FileFormat) -> FileFormatResult<String> {
        common::serialize(self, format)
    }

    /// Installs the process-wide RAM default.
    pub fn apply(&self) {
        set_default_available_ram_mb(self.default_available_ram_mb);
    }

    /// Installs the global tracing subscriber. Fails if one is already installed.
    pub fn init_logging(&self) -> StreamResult<()> {
        match &self.log_dir {
            Some(dir) => common::log_setup::setup_logging(&self.log_level, dir)?,
            None => common::log_setup::setup_console_logging(&self.log_level)?,
        }
        Ok(())
    }

    pub fn execution_context(&self) -> StreamResult<ExecutionContext> {
        Ok(ExecutionContext::new(self.worker_threads)?.with_release_data(self.release_data))
    }

    pub fn streaming_manager<const D: usize>(&self) -> Box<dyn StreamingManager<D>> {
        self.mode.build(self.bias)
    }
}
