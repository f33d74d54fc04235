//! Filesystem body store: the cold tier.
//!
//! Combines the path allocator and the payload codec into the storage
//! capability the engine writes bodies through. Bodies are immutable once
//! written; the only mutation is deletion by the retention sweeper.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use telvault_core::Result;

use crate::codec::{BodyCodec, EncodedBody};
use crate::paths::PathAllocator;

/// A stored body: where it landed and what the codec reported.
#[derive(Debug, Clone)]
pub struct StoredBody {
    /// Final body path
    pub path: PathBuf,
    /// Checksum and on-disk size
    pub encoded: EncodedBody,
}

/// Body storage rooted at a configured archive directory.
#[derive(Debug, Clone)]
pub struct FsBodyStore {
    paths: PathAllocator,
    codec: BodyCodec,
}

impl FsBodyStore {
    /// Create a body store under `root` with the given compression level.
    pub fn new(root: impl Into<PathBuf>, compression_level: i32) -> Self {
        Self {
            paths: PathAllocator::new(root),
            codec: BodyCodec::new(compression_level),
        }
    }

    /// The archive root directory.
    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Allocate a partitioned path and write the body there atomically.
    pub fn write(
        &self,
        device_id: &str,
        emotion: &str,
        timestamp: DateTime<Utc>,
        entry_id: &str,
        body: &Map<String, Value>,
        compress: bool,
    ) -> Result<StoredBody> {
        let path = self
            .paths
            .allocate(device_id, emotion, timestamp, entry_id, compress)?;
        let encoded = self.codec.encode(body, &path, compress)?;
        Ok(StoredBody { path, encoded })
    }

    /// Read a body back; I/O errors pass through for the caller to map.
    pub fn read(&self, path: &Path, compressed: bool) -> Result<Map<String, Value>> {
        self.codec.decode(path, compressed)
    }

    /// Delete a body file. A file already gone is not an error; returns
    /// whether anything was actually removed.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::tempdir;

    fn body() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("emotion".to_string(), json!("calm"));
        map
    }

    #[test]
    fn write_read_remove_lifecycle() {
        let dir = tempdir().unwrap();
        let store = FsBodyStore::new(dir.path(), 3);
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let stored = store
            .write("d1", "calm", ts, "abc123", &body(), true)
            .unwrap();
        assert!(stored.path.starts_with(dir.path()));
        assert_eq!(store.read(&stored.path, true).unwrap(), body());

        assert!(store.remove(&stored.path).unwrap());
        assert!(!store.remove(&stored.path).unwrap());
    }

    #[test]
    fn rewrite_same_entry_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FsBodyStore::new(dir.path(), 3);
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let first = store
            .write("d1", "calm", ts, "abc123", &body(), false)
            .unwrap();
        let second = store
            .write("d1", "calm", ts, "abc123", &body(), false)
            .unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(first.encoded, second.encoded);
    }
}
