//! Archiver configuration.
//!
//! All knobs recognized by the engine, loadable from a JSON file. A missing
//! config file is not an error; defaults apply and the fallback is logged.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Configuration for the archive engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Root directory of the body file tree
    pub archive_root: PathBuf,
    /// Whether bodies are zstd-compressed on write
    pub compression_enabled: bool,
    /// zstd compression level; correctness never depends on it
    pub compression_level: i32,
    /// Retention window for the sweeper
    pub retention_days: u32,
    /// Sweep batch size, used for progress logging
    pub batch_size: usize,
    /// Hot cache TTL in seconds
    pub cache_ttl_secs: u64,
    /// Whether entry metadata is mirrored to the backup replica
    pub backup_enabled: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            archive_root: PathBuf::from("./archives"),
            compression_enabled: true,
            compression_level: 9,
            retention_days: 365,
            batch_size: 100,
            cache_ttl_secs: 3600,
            backup_enabled: true,
        }
    }
}

impl ArchiveConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields defaults; a present but malformed file is an
    /// error, so a typo never silently reverts the deployment to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Validation(format!("config {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "archiver configuration loaded");
        Ok(config)
    }
}
