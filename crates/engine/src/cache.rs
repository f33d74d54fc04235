//! TTL-bound hot cache for entry metadata.
//!
//! In-process stand-in for the ephemeral key/value service: every entry
//! carries a deadline and expires on its own regardless of explicit
//! deletion. The cache is strictly derived data; callers treat any miss or
//! failure as a fall-through to the primary index.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use telvault_core::{Cache, IndexedEntry, Result};

/// Default cache TTL, one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct Slot {
    expires_at: Instant,
    entry: IndexedEntry,
}

/// In-process TTL cache keyed by entry id.
pub struct TtlCache {
    ttl: Duration,
    slots: RwLock<HashMap<String, Slot>>,
}

impl TtlCache {
    /// Create a cache with the default one-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with an explicit TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots
            .read()
            .values()
            .filter(|s| s.expires_at > now)
            .count()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired slot. Expiry is otherwise lazy, on access.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.slots.write().retain(|_, s| s.expires_at > now);
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for TtlCache {
    fn put(&self, entry: &IndexedEntry) -> Result<()> {
        let slot = Slot {
            expires_at: Instant::now() + self.ttl,
            entry: entry.clone(),
        };
        self.slots.write().insert(entry.entry_id.clone(), slot);
        Ok(())
    }

    fn get(&self, entry_id: &str) -> Result<Option<IndexedEntry>> {
        {
            let slots = self.slots.read();
            match slots.get(entry_id) {
                None => return Ok(None),
                Some(slot) if slot.expires_at > Instant::now() => {
                    return Ok(Some(slot.entry.clone()))
                }
                Some(_) => {}
            }
        }
        // Expired: evict under the write lock.
        self.slots.write().remove(entry_id);
        Ok(None)
    }

    fn remove(&self, entry_id: &str) -> Result<()> {
        self.slots.write().remove(entry_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(id: &str) -> IndexedEntry {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        IndexedEntry {
            entry_id: id.to_string(),
            device_id: "d1".to_string(),
            emotion: "calm".to_string(),
            emotion_score: 0.8,
            confidence: 0.9,
            timestamp: ts,
            edge_node_id: "e1".to_string(),
            archive_path: format!("/archive/{}.json", id),
            checksum: "00".repeat(32),
            compressed: false,
            size_bytes: 64,
            created_at: ts,
        }
    }

    #[test]
    fn put_get_remove() {
        let cache = TtlCache::new();
        cache.put(&entry("a")).unwrap();
        assert_eq!(cache.get("a").unwrap().unwrap().entry_id, "a");

        cache.remove("a").unwrap();
        assert!(cache.get("a").unwrap().is_none());
    }

    #[test]
    fn miss_on_unknown_id() {
        let cache = TtlCache::new();
        assert!(cache.get("nope").unwrap().is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TtlCache::with_ttl(Duration::ZERO);
        cache.put(&entry("a")).unwrap();
        assert!(cache.get("a").unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn put_overwrites_existing() {
        let cache = TtlCache::new();
        cache.put(&entry("a")).unwrap();
        let mut updated = entry("a");
        updated.emotion = "joy".to_string();
        cache.put(&updated).unwrap();

        assert_eq!(cache.get("a").unwrap().unwrap().emotion, "joy");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn purge_drops_expired_slots() {
        let cache = TtlCache::with_ttl(Duration::ZERO);
        cache.put(&entry("a")).unwrap();
        cache.put(&entry("b")).unwrap();
        cache.purge_expired();
        assert_eq!(cache.slots.read().len(), 0);
    }
}
