//! Storage-tier contracts.
//!
//! The archive engine composes three tiers through these traits so that the
//! index, cache, and backup backends can be substituted in tests (and, for
//! the cache and backup, by remote adapters in deployment):
//!
//! - [`MetadataIndex`]: the durable catalog, the source of truth together
//!   with the body files.
//! - [`Cache`]: an ephemeral TTL-bound fast path. Strictly derived data;
//!   a miss or failure always falls through to the index.
//! - [`BackupReplica`]: a best-effort external mirror of metadata, never
//!   read on the normal retrieve path.
//!
//! Cache and backup implementations must bound the latency of every call;
//! the engine treats their failures as non-fatal but calls them on the
//! critical path.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{ArchiveQuery, IndexedEntry};

/// A row identified for retention deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredEntry {
    /// Primary key of the expired row
    pub entry_id: String,
    /// Body file to delete
    pub archive_path: String,
}

/// Aggregate view of the index, for statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSnapshot {
    /// Number of rows
    pub entries: u64,
    /// Sum of body sizes in bytes
    pub total_bytes: u64,
}

/// Durable catalog of entry metadata.
///
/// Writes are idempotent upserts keyed by `entry_id`; each row write is
/// atomic, so concurrent upserts for distinct ids never interleave within
/// a row and same-id upserts are last-writer-wins.
pub trait MetadataIndex: Send + Sync {
    /// Insert or replace the row for `entry.entry_id`.
    ///
    /// Fails with `Error::IdentityCollision` if an existing row under the
    /// same id carries a different `(device_id, timestamp, edge_node_id)`
    /// triple.
    fn upsert(&self, entry: &IndexedEntry) -> Result<()>;

    /// Look up one row by id.
    fn get(&self, entry_id: &str) -> Result<Option<IndexedEntry>>;

    /// Filtered range scan, ordered by timestamp descending, capped at
    /// `query.limit`.
    fn query(&self, query: &ArchiveQuery) -> Result<Vec<IndexedEntry>>;

    /// Delete one row. Returns whether a row existed.
    fn remove(&self, entry_id: &str) -> Result<bool>;

    /// All rows with `timestamp` strictly before `cutoff`.
    fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExpiredEntry>>;

    /// Row count and total body bytes.
    fn snapshot(&self) -> Result<IndexSnapshot>;
}

/// Ephemeral TTL-bound metadata cache.
///
/// Implementations may drop entries at any time; the engine never relies on
/// a cached value being present.
pub trait Cache: Send + Sync {
    /// Store metadata under its entry id, subject to the implementation TTL.
    fn put(&self, entry: &IndexedEntry) -> Result<()>;

    /// Fetch metadata by entry id, if present and not expired.
    fn get(&self, entry_id: &str) -> Result<Option<IndexedEntry>>;

    /// Drop the cached entry, if any.
    fn remove(&self, entry_id: &str) -> Result<()>;
}

/// Best-effort durable mirror of entry metadata.
///
/// Exists for disaster recovery only; the engine never reads it back.
pub trait BackupReplica: Send + Sync {
    /// Insert or replace the mirrored metadata for `entry.entry_id`.
    fn upsert(&self, entry: &IndexedEntry) -> Result<()>;

    /// Remove the mirrored metadata, if any.
    fn remove(&self, entry_id: &str) -> Result<()>;
}
