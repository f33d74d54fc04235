//! Partitioned archive path allocation.
//!
//! Bodies are laid out as `root/year/month/day/device/emotion/{entry_id}.ext`
//! so retention sweeps and time-range scans can prune whole directories
//! instead of walking the full corpus. The extension records whether the
//! body is compressed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use telvault_core::Result;

/// Extension of uncompressed body files.
pub const PLAIN_EXTENSION: &str = "json";
/// Extension of zstd-compressed body files.
pub const COMPRESSED_EXTENSION: &str = "json.zst";

/// Maps entry attributes to a partitioned storage location.
#[derive(Debug, Clone)]
pub struct PathAllocator {
    root: PathBuf,
}

impl PathAllocator {
    /// Create an allocator rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The archive root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Partition directory for an entry, without creating it.
    pub fn partition_dir(
        &self,
        device_id: &str,
        emotion: &str,
        timestamp: DateTime<Utc>,
    ) -> PathBuf {
        self.root
            .join(timestamp.year().to_string())
            .join(format!("{:02}", timestamp.month()))
            .join(format!("{:02}", timestamp.day()))
            .join(device_id)
            .join(emotion)
    }

    /// Allocate the body path for an entry, creating the partition
    /// directory on demand. Directory creation is idempotent; "already
    /// exists" is not an error, so concurrent allocators are safe.
    pub fn allocate(
        &self,
        device_id: &str,
        emotion: &str,
        timestamp: DateTime<Utc>,
        entry_id: &str,
        compressed: bool,
    ) -> Result<PathBuf> {
        let dir = self.partition_dir(device_id, emotion, timestamp);
        std::fs::create_dir_all(&dir)?;
        let ext = if compressed {
            COMPRESSED_EXTENSION
        } else {
            PLAIN_EXTENSION
        };
        Ok(dir.join(format!("{}.{}", entry_id, ext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap()
    }

    #[test]
    fn partition_is_year_month_day_device_emotion() {
        let alloc = PathAllocator::new("/archive");
        let dir = alloc.partition_dir("d1", "calm", ts());
        assert_eq!(dir, PathBuf::from("/archive/2024/03/07/d1/calm"));
    }

    #[test]
    fn month_and_day_are_zero_padded() {
        let alloc = PathAllocator::new("/archive");
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let dir = alloc.partition_dir("d", "joy", t);
        assert!(dir.to_string_lossy().contains("/01/02/"));
    }

    #[test]
    fn extension_reflects_compression() {
        let dir = tempdir().unwrap();
        let alloc = PathAllocator::new(dir.path());

        let plain = alloc.allocate("d1", "calm", ts(), "abc123", false).unwrap();
        assert!(plain.to_string_lossy().ends_with("abc123.json"));

        let zst = alloc.allocate("d1", "calm", ts(), "abc123", true).unwrap();
        assert!(zst.to_string_lossy().ends_with("abc123.json.zst"));
    }

    #[test]
    fn allocate_is_idempotent() {
        let dir = tempdir().unwrap();
        let alloc = PathAllocator::new(dir.path());
        let a = alloc.allocate("d1", "calm", ts(), "abc123", true).unwrap();
        let b = alloc.allocate("d1", "calm", ts(), "abc123", true).unwrap();
        assert_eq!(a, b);
        assert!(a.parent().unwrap().is_dir());
    }
}
