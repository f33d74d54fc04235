//! Archive engine orchestration.
//!
//! Composes the tiers into the four public operations: `archive`,
//! `retrieve`, `query`, `cleanup`. The durability commit point of a write
//! is the index upsert; everything after it (backup replica, hot cache) is
//! best-effort fan-out whose failures are logged and swallowed.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use telvault_core::{
    canonical_timestamp, entry_id, ArchiveConfig, ArchiveEntry, ArchiveQuery, ArchiveStats,
    BackupReplica, Cache, Error, IndexedEntry, MetadataIndex, Result, RetrievedEntry, SensorEvent,
};
use telvault_storage::{BodyCodec, FsBodyStore};
use tracing::{debug, error, info, warn};

use crate::sweeper;

/// Version tag written into every stored body.
const BODY_FORMAT_VERSION: &str = "1.0.0";

#[derive(Default)]
struct RunningStats {
    compressed_entries: u64,
    last_archived: Option<DateTime<Utc>>,
}

/// The archival storage engine.
///
/// Owns the cold body store directly and the substitutable tiers through
/// their traits. All dependencies are passed in at construction; the
/// caller manages their lifecycle.
pub struct ArchiveEngine {
    config: ArchiveConfig,
    index: Box<dyn MetadataIndex>,
    bodies: FsBodyStore,
    cache: Box<dyn Cache>,
    backup: Box<dyn BackupReplica>,
    running: Mutex<RunningStats>,
}

impl ArchiveEngine {
    /// Create an engine over explicit tier instances.
    pub fn new(
        config: ArchiveConfig,
        index: Box<dyn MetadataIndex>,
        cache: Box<dyn Cache>,
        backup: Box<dyn BackupReplica>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.archive_root)?;
        let bodies = FsBodyStore::new(&config.archive_root, config.compression_level);
        info!(root = %config.archive_root.display(), "archive engine opened");
        Ok(Self {
            config,
            index,
            bodies,
            cache,
            backup,
            running: Mutex::new(RunningStats::default()),
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Archive one event, returning its entry id.
    ///
    /// Idempotent: re-archiving the same `(device, timestamp, edge node)`
    /// triple overwrites the previous copy under the same id. The
    /// operation fails only if validation, the body write, or the index
    /// upsert fails; cache and backup failures are logged and ignored.
    pub fn archive(&self, event: &SensorEvent) -> Result<String> {
        let timestamp = event.validate()?;
        let id = entry_id(&event.device_id, timestamp, &event.edge_node_id);

        let body = build_body(event, &id, timestamp);
        let compress = self.config.compression_enabled;
        let stored = self.bodies.write(
            &event.device_id,
            &event.emotion,
            timestamp,
            &id,
            &body,
            compress,
        )?;

        let entry = ArchiveEntry {
            entry_id: id.clone(),
            device_id: event.device_id.clone(),
            emotion: event.emotion.clone(),
            emotion_score: event.emotion_score,
            confidence: event.confidence,
            timestamp,
            edge_node_id: event.edge_node_id.clone(),
            raw_data: event.raw_data.clone(),
            archive_path: stored.path.to_string_lossy().to_string(),
            checksum: stored.encoded.checksum.clone(),
            compressed: compress,
            size_bytes: stored.encoded.size_bytes,
        };

        let now = Utc::now();
        let indexed = IndexedEntry::from_entry(&entry, now);
        // Durability commit point: after this upsert the entry is archived.
        self.index.upsert(&indexed)?;

        if let Err(e) = self.backup.upsert(&indexed) {
            warn!(entry_id = %id, error = %e, "backup replica write failed, continuing");
        }
        if let Err(e) = self.cache.put(&indexed) {
            warn!(entry_id = %id, error = %e, "hot cache write failed, continuing");
        }

        {
            let mut running = self.running.lock();
            if compress {
                running.compressed_entries += 1;
            }
            running.last_archived = Some(now);
        }

        info!(entry_id = %id, size_bytes = stored.encoded.size_bytes, "event archived");
        Ok(id)
    }

    /// Retrieve an archived entry's metadata and verified body.
    ///
    /// The hot cache only short-circuits the index lookup; the body always
    /// comes from the file tree and is checksum-verified before being
    /// returned. A stale cache hit (entry swept meanwhile) falls through
    /// to the index.
    pub fn retrieve(&self, entry_id: &str) -> Result<RetrievedEntry> {
        let cached = match self.cache.get(entry_id) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(entry_id, error = %e, "hot cache read failed, falling through");
                None
            }
        };
        if let Some(meta) = cached {
            debug!(entry_id, "hot cache hit");
            match self.load_verified(meta) {
                Err(e) if e.is_not_found() => {
                    let _ = self.cache.remove(entry_id);
                }
                other => return other,
            }
        }

        let meta = self
            .index
            .get(entry_id)?
            .ok_or_else(|| Error::NotFound(entry_id.to_string()))?;
        self.load_verified(meta)
    }

    /// Filtered metadata query, newest first.
    ///
    /// A finite snapshot; re-issuing the same filter yields a fresh,
    /// deterministically ordered result.
    pub fn query(&self, query: &ArchiveQuery) -> Result<Vec<IndexedEntry>> {
        self.index.query(query)
    }

    /// Delete entries older than the retention window from every tier.
    ///
    /// Defaults to the configured window; returns the number of entries
    /// fully removed.
    pub fn cleanup(&self, retention_days: Option<u32>) -> Result<usize> {
        let days = retention_days.unwrap_or(self.config.retention_days);
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        sweeper::sweep(
            self.index.as_ref(),
            &self.bodies,
            self.cache.as_ref(),
            self.backup.as_ref(),
            cutoff,
            self.config.batch_size,
        )
    }

    /// Current statistics: index snapshot plus running write-path counters.
    pub fn stats(&self) -> Result<ArchiveStats> {
        let snap = self.index.snapshot()?;
        let running = self.running.lock();
        Ok(ArchiveStats {
            total_entries: snap.entries,
            total_size_bytes: snap.total_bytes,
            compressed_entries: running.compressed_entries,
            last_archived: running.last_archived,
            retention_days: self.config.retention_days,
        })
    }

    fn load_verified(&self, meta: IndexedEntry) -> Result<RetrievedEntry> {
        let path = Path::new(&meta.archive_path);
        let body = match self.bodies.read(path, meta.compressed) {
            Ok(body) => body,
            // The sweeper may have deleted the body between the metadata
            // lookup and the open; that is a not-found, not a crash.
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingBody {
                    entry_id: meta.entry_id.clone(),
                    path: meta.archive_path.clone(),
                })
            }
            Err(e) => return Err(e),
        };

        let actual = BodyCodec::checksum(&body)?;
        if actual != meta.checksum {
            error!(entry_id = %meta.entry_id, "checksum mismatch on retrieve");
            return Err(Error::Corruption {
                entry_id: meta.entry_id.clone(),
                expected: meta.checksum.clone(),
                actual,
            });
        }
        Ok(RetrievedEntry {
            metadata: meta,
            body,
        })
    }
}

/// The stored body: every event field plus archival audit fields. This is
/// the byte content the checksum covers.
fn build_body(event: &SensorEvent, entry_id: &str, timestamp: DateTime<Utc>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("entry_id".to_string(), Value::String(entry_id.to_string()));
    body.insert(
        "device_id".to_string(),
        Value::String(event.device_id.clone()),
    );
    body.insert("emotion".to_string(), Value::String(event.emotion.clone()));
    body.insert("emotion_score".to_string(), json_f64(event.emotion_score));
    body.insert("confidence".to_string(), json_f64(event.confidence));
    body.insert(
        "timestamp".to_string(),
        Value::String(canonical_timestamp(timestamp)),
    );
    body.insert(
        "edge_node_id".to_string(),
        Value::String(event.edge_node_id.clone()),
    );
    body.insert("raw_data".to_string(), Value::Object(event.raw_data.clone()));
    body.insert(
        "archived_at".to_string(),
        Value::String(canonical_timestamp(Utc::now())),
    );
    body.insert(
        "version".to_string(),
        Value::String(BODY_FORMAT_VERSION.to_string()),
    );
    body
}

fn json_f64(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        // Scores are validated into [0.0, 1.0] before this point.
        .unwrap_or(Value::Null)
}
