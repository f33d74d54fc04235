//! Domain types for the archival engine.
//!
//! `SensorEvent` is the ingestion input; `ArchiveEntry` is the full unit of
//! storage (metadata + body); `IndexedEntry` is the metadata row kept in the
//! primary index, cached in the hot tier, and mirrored to the backup
//! replica. The raw payload is stored only in the body file, never indexed.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Default cap on query result size.
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// Render a timestamp in the canonical fixed-width form used everywhere a
/// timestamp becomes a string: identity hashing and index storage.
///
/// Microsecond precision keeps the representation fixed-width, so the
/// lexicographic order of stored timestamps equals chronological order.
pub fn canonical_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// An incoming sensor-derived event, as handed over by the ingestion
/// transport.
///
/// The timestamp arrives as an ISO-8601 string and is parsed to UTC during
/// validation; everything in `raw_data` is preserved verbatim in the stored
/// body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorEvent {
    /// Originating device
    pub device_id: String,
    /// Categorical emotion label
    pub emotion: String,
    /// Model output score, in [0.0, 1.0]
    pub emotion_score: f64,
    /// Model confidence, in [0.0, 1.0]
    pub confidence: f64,
    /// Event time, ISO-8601
    pub timestamp: String,
    /// Edge node that forwarded the event
    pub edge_node_id: String,
    /// Arbitrary structured payload, stored but never indexed
    #[serde(default)]
    pub raw_data: Map<String, Value>,
}

impl SensorEvent {
    /// Validate the event and return its parsed UTC timestamp.
    ///
    /// Rejected events never reach any storage tier. Identifier fields must
    /// be non-empty and filesystem-safe because they become path components.
    pub fn validate(&self) -> Result<DateTime<Utc>> {
        validate_path_component("device_id", &self.device_id)?;
        validate_path_component("edge_node_id", &self.edge_node_id)?;
        validate_path_component("emotion", &self.emotion)?;
        validate_unit_range("emotion_score", self.emotion_score)?;
        validate_unit_range("confidence", self.confidence)?;

        let ts = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| Error::Validation(format!("timestamp '{}': {}", self.timestamp, e)))?;
        Ok(ts.with_timezone(&Utc))
    }
}

fn validate_path_component(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(Error::Validation(format!(
            "{} '{}' is not a valid path component",
            field, value
        )));
    }
    Ok(())
}

fn validate_unit_range(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Validation(format!(
            "{} {} outside [0.0, 1.0]",
            field, value
        )));
    }
    Ok(())
}

/// One archived event: indexed metadata plus the raw payload that goes into
/// the body file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Deterministic content-derived primary key (16 hex chars)
    pub entry_id: String,
    /// Originating device
    pub device_id: String,
    /// Categorical emotion label
    pub emotion: String,
    /// Model output score
    pub emotion_score: f64,
    /// Model confidence
    pub confidence: f64,
    /// Event time, UTC
    pub timestamp: DateTime<Utc>,
    /// Edge node that forwarded the event
    pub edge_node_id: String,
    /// Raw payload, preserved verbatim in the body
    pub raw_data: Map<String, Value>,
    /// Location of the stored body, owned by the storage tier
    pub archive_path: String,
    /// Sha-256 hex of the canonical uncompressed body
    pub checksum: String,
    /// Whether the body at `archive_path` is zstd-compressed
    pub compressed: bool,
    /// On-disk size of the stored body
    pub size_bytes: u64,
}

/// The metadata row for one entry, as stored in the primary index.
///
/// This is `ArchiveEntry` minus `raw_data`, plus the `created_at` audit
/// column. The hot cache and backup replica hold exactly this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
    /// Deterministic content-derived primary key
    pub entry_id: String,
    /// Originating device
    pub device_id: String,
    /// Categorical emotion label
    pub emotion: String,
    /// Model output score
    pub emotion_score: f64,
    /// Model confidence
    pub confidence: f64,
    /// Event time, UTC
    pub timestamp: DateTime<Utc>,
    /// Edge node that forwarded the event
    pub edge_node_id: String,
    /// Location of the stored body
    pub archive_path: String,
    /// Sha-256 hex of the canonical uncompressed body
    pub checksum: String,
    /// Whether the body is zstd-compressed
    pub compressed: bool,
    /// On-disk size of the stored body
    pub size_bytes: u64,
    /// When this row was written
    pub created_at: DateTime<Utc>,
}

impl IndexedEntry {
    /// Project the indexable metadata out of a full entry.
    pub fn from_entry(entry: &ArchiveEntry, created_at: DateTime<Utc>) -> Self {
        Self {
            entry_id: entry.entry_id.clone(),
            device_id: entry.device_id.clone(),
            emotion: entry.emotion.clone(),
            emotion_score: entry.emotion_score,
            confidence: entry.confidence,
            timestamp: entry.timestamp,
            edge_node_id: entry.edge_node_id.clone(),
            archive_path: entry.archive_path.clone(),
            checksum: entry.checksum.clone(),
            compressed: entry.compressed,
            size_bytes: entry.size_bytes,
            created_at,
        }
    }
}

/// A retrieved entry: the index metadata plus the decoded, verified body.
#[derive(Debug, Clone)]
pub struct RetrievedEntry {
    /// Metadata as recorded in the index (or hot cache)
    pub metadata: IndexedEntry,
    /// Decoded body, checksum-verified
    pub body: Map<String, Value>,
}

/// Filter parameters for archive queries.
///
/// Each filter set is an OR within its dimension; dimensions combine with
/// AND. Results are ordered by timestamp descending and capped at `limit`.
#[derive(Debug, Clone)]
pub struct ArchiveQuery {
    /// Inclusive lower time bound
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper time bound
    pub end: Option<DateTime<Utc>>,
    /// Restrict to these devices
    pub device_ids: Option<Vec<String>>,
    /// Restrict to these emotion labels
    pub emotions: Option<Vec<String>>,
    /// Restrict to these edge nodes
    pub edge_node_ids: Option<Vec<String>>,
    /// Inclusive lower confidence bound
    pub min_confidence: f64,
    /// Inclusive upper confidence bound
    pub max_confidence: f64,
    /// Maximum number of rows returned
    pub limit: usize,
}

impl Default for ArchiveQuery {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            device_ids: None,
            emotions: None,
            edge_node_ids: None,
            min_confidence: 0.0,
            max_confidence: 1.0,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// Archive statistics: an index snapshot plus running write-path counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveStats {
    /// Rows currently in the index
    pub total_entries: u64,
    /// Sum of on-disk body sizes
    pub total_size_bytes: u64,
    /// Entries archived compressed since this engine was opened
    pub compressed_entries: u64,
    /// Timestamp of the most recent successful archive
    pub last_archived: Option<DateTime<Utc>>,
    /// Configured retention window
    pub retention_days: u32,
}
