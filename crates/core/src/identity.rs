//! Deterministic entry identity.
//!
//! An entry's id is a pure function of `(device_id, timestamp, edge_node_id)`:
//! re-archiving the same triple produces the same id, which makes the write
//! path an idempotent upsert instead of a duplicate insert.
//!
//! The id is the first 16 hex characters of a Sha-256 over the colon-joined
//! triple. Truncation shrinks the collision space from 256 to 64 bits; the
//! index upsert guards against that by refusing to overwrite a row whose
//! identity triple differs from the incoming one.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::types::canonical_timestamp;

/// Length of an entry id in hex characters.
pub const ENTRY_ID_LEN: usize = 16;

/// Derive the entry id for an identity triple.
pub fn entry_id(device_id: &str, timestamp: DateTime<Utc>, edge_node_id: &str) -> String {
    let material = format!(
        "{}:{}:{}",
        device_id,
        canonical_timestamp(timestamp),
        edge_node_id
    );
    let digest = Sha256::digest(material.as_bytes());
    digest[..ENTRY_ID_LEN / 2]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
