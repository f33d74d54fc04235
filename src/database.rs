//! Main entry point for Telvault.
//!
//! This module provides the `Telvault` struct, the primary entry point for
//! all archive operations, and the builder that wires the storage tiers
//! together.

use std::path::Path;
use std::time::Duration;

use telvault_core::{
    ArchiveConfig, ArchiveQuery, ArchiveStats, BackupReplica, Cache, IndexedEntry, Result,
    RetrievedEntry, SensorEvent,
};
use telvault_engine::{ArchiveEngine, FileBackup, NullBackup, TtlCache};
use telvault_storage::SqliteIndex;
use tracing::debug;

/// File name of the primary index database under the archive root.
const INDEX_FILE: &str = "archive_index.db";
/// Directory of the file-backed backup replica under the archive root.
const BACKUP_DIR: &str = "backup";

/// The Telvault archive.
///
/// Create one with [`Telvault::open`] for defaults or [`Telvault::builder`]
/// for full control over configuration and tier implementations.
///
/// # Example
///
/// ```ignore
/// use telvault::prelude::*;
///
/// let vault = Telvault::builder()
///     .path("./my-archive")
///     .compression(false)
///     .retention_days(30)
///     .open()?;
///
/// let id = vault.archive(&event)?;
/// let entry = vault.retrieve(&id)?;
/// ```
pub struct Telvault {
    engine: ArchiveEngine,
}

impl Telvault {
    /// Open an archive rooted at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Create a builder for archive configuration.
    pub fn builder() -> TelvaultBuilder {
        TelvaultBuilder::new()
    }

    /// Archive one event, returning its deterministic entry id.
    pub fn archive(&self, event: &SensorEvent) -> Result<String> {
        self.engine.archive(event)
    }

    /// Retrieve an entry's metadata and checksum-verified body.
    pub fn retrieve(&self, entry_id: &str) -> Result<RetrievedEntry> {
        self.engine.retrieve(entry_id)
    }

    /// Query entry metadata, newest first.
    pub fn query(&self, query: &ArchiveQuery) -> Result<Vec<IndexedEntry>> {
        self.engine.query(query)
    }

    /// Sweep entries older than the retention window (configured window
    /// when `None`). Returns the number of entries fully removed.
    pub fn cleanup(&self, retention_days: Option<u32>) -> Result<usize> {
        self.engine.cleanup(retention_days)
    }

    /// Archive statistics.
    pub fn stats(&self) -> Result<ArchiveStats> {
        self.engine.stats()
    }

    /// The active configuration.
    pub fn config(&self) -> &ArchiveConfig {
        self.engine.config()
    }
}

/// Builder for [`Telvault`].
///
/// Every configuration knob has a default; custom `Cache` and
/// `BackupReplica` implementations may be substituted for the built-in
/// in-process tiers.
pub struct TelvaultBuilder {
    config: ArchiveConfig,
    cache: Option<Box<dyn Cache>>,
    backup: Option<Box<dyn BackupReplica>>,
}

impl TelvaultBuilder {
    fn new() -> Self {
        Self {
            config: ArchiveConfig::default(),
            cache: None,
            backup: None,
        }
    }

    /// Set the archive root directory.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.archive_root = path.as_ref().to_path_buf();
        self
    }

    /// Replace the entire configuration. The archive root from a previous
    /// `path` call is overwritten too.
    pub fn config(mut self, config: ArchiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable body compression.
    pub fn compression(mut self, enabled: bool) -> Self {
        self.config.compression_enabled = enabled;
        self
    }

    /// zstd compression level.
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Retention window in days.
    pub fn retention_days(mut self, days: u32) -> Self {
        self.config.retention_days = days;
        self
    }

    /// Hot cache TTL.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl_secs = ttl.as_secs();
        self
    }

    /// Enable or disable the backup replica.
    pub fn backup_enabled(mut self, enabled: bool) -> Self {
        self.config.backup_enabled = enabled;
        self
    }

    /// Substitute a custom hot cache implementation.
    pub fn cache(mut self, cache: Box<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Substitute a custom backup replica implementation.
    pub fn backup(mut self, backup: Box<dyn BackupReplica>) -> Self {
        self.backup = Some(backup);
        self
    }

    /// Open the archive: the primary index, body store, and best-effort
    /// tiers are created under the configured root.
    pub fn open(self) -> Result<Telvault> {
        let config = self.config;
        let index = SqliteIndex::open(config.archive_root.join(INDEX_FILE))?;

        let cache = self.cache.unwrap_or_else(|| {
            Box::new(TtlCache::with_ttl(Duration::from_secs(config.cache_ttl_secs)))
        });
        let backup = self.backup.unwrap_or_else(|| {
            if config.backup_enabled {
                Box::new(FileBackup::new(config.archive_root.join(BACKUP_DIR)))
                    as Box<dyn BackupReplica>
            } else {
                debug!("backup replica disabled by configuration");
                Box::new(NullBackup)
            }
        });

        let engine = ArchiveEngine::new(config, Box::new(index), cache, backup)?;
        Ok(Telvault { engine })
    }
}

impl Default for TelvaultBuilder {
    fn default() -> Self {
        Self::new()
    }
}
