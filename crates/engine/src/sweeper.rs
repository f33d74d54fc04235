//! Retention sweep: delete entries older than the retention cutoff from
//! every tier, or leave them for the next cycle.
//!
//! Per-entry failures are logged and skipped so one bad entry never aborts
//! the rest of the sweep; a partially completed sweep is valid, remaining
//! old entries go in the next cycle. The body file is deleted before the
//! index row: an index row pointing at a missing body surfaces as a
//! not-found to readers, whereas an orphaned body would be invisible to
//! every query and leak disk forever.

use chrono::{DateTime, Utc};
use telvault_core::{BackupReplica, Cache, ExpiredEntry, MetadataIndex, Result};
use telvault_storage::FsBodyStore;
use tracing::{debug, info, warn};

/// Remove every entry with `timestamp < cutoff` from storage, index,
/// cache, and backup. Returns how many entries were fully removed.
///
/// Safe to run concurrently with writes and reads, and safe to re-run:
/// a second sweep over the same cutoff removes nothing.
pub fn sweep(
    index: &dyn MetadataIndex,
    bodies: &FsBodyStore,
    cache: &dyn Cache,
    backup: &dyn BackupReplica,
    cutoff: DateTime<Utc>,
    batch_size: usize,
) -> Result<usize> {
    let expired = index.expired(cutoff)?;
    if expired.is_empty() {
        debug!(cutoff = %cutoff, "retention sweep found nothing to remove");
        return Ok(0);
    }

    info!(candidates = expired.len(), cutoff = %cutoff, "retention sweep started");
    let mut removed = 0usize;
    for (i, entry) in expired.iter().enumerate() {
        match sweep_one(index, bodies, cache, backup, entry) {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(entry_id = %entry.entry_id, error = %e, "failed to sweep entry, skipping");
            }
        }
        if batch_size > 0 && (i + 1) % batch_size == 0 {
            debug!(processed = i + 1, removed, "sweep progress");
        }
    }
    info!(removed, "retention sweep finished");
    Ok(removed)
}

fn sweep_one(
    index: &dyn MetadataIndex,
    bodies: &FsBodyStore,
    cache: &dyn Cache,
    backup: &dyn BackupReplica,
    entry: &ExpiredEntry,
) -> Result<bool> {
    // A body already gone is fine; someone may have purged it by hand.
    let existed = bodies.remove(std::path::Path::new(&entry.archive_path))?;
    if !existed {
        debug!(entry_id = %entry.entry_id, path = %entry.archive_path, "body already absent");
    }

    let row_removed = index.remove(&entry.entry_id)?;

    // Derived tiers: failures here never block the sweep.
    if let Err(e) = cache.remove(&entry.entry_id) {
        warn!(entry_id = %entry.entry_id, error = %e, "cache eviction failed");
    }
    if let Err(e) = backup.remove(&entry.entry_id) {
        warn!(entry_id = %entry.entry_id, error = %e, "backup removal failed");
    }

    Ok(row_removed)
}
