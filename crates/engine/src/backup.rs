//! Backup replica adapters.
//!
//! The replica mirrors entry metadata (never bodies) into an external
//! durable store for disaster recovery. It is write-only from the engine's
//! point of view: `retrieve()` never reads it, and its failures never fail
//! an archive operation.

use std::path::PathBuf;

use telvault_core::{BackupReplica, Error, IndexedEntry, Result};

/// File-backed replica: one JSON document per entry under a mirror
/// directory. Stands in for a remote document store.
pub struct FileBackup {
    root: PathBuf,
}

impl FileBackup {
    /// Create a replica writing under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn doc_path(&self, entry_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", entry_id))
    }
}

impl BackupReplica for FileBackup {
    fn upsert(&self, entry: &IndexedEntry) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| Error::Dependency(format!("backup dir: {}", e)))?;
        let doc = serde_json::to_vec_pretty(entry)
            .map_err(|e| Error::Dependency(format!("backup encode: {}", e)))?;
        std::fs::write(self.doc_path(&entry.entry_id), doc)
            .map_err(|e| Error::Dependency(format!("backup write: {}", e)))?;
        Ok(())
    }

    fn remove(&self, entry_id: &str) -> Result<()> {
        match std::fs::remove_file(self.doc_path(entry_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Dependency(format!("backup remove: {}", e))),
        }
    }
}

/// No-op replica, used when backups are disabled in configuration.
pub struct NullBackup;

impl BackupReplica for NullBackup {
    fn upsert(&self, _entry: &IndexedEntry) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _entry_id: &str) -> Result<()> {
        Ok(())
    }
}
