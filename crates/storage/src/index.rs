//! SQLite-backed primary index.
//!
//! One row per archived entry holding every metadata field (never the raw
//! payload), keyed by `entry_id`, with secondary indexes for the three
//! filter dimensions paired with the timestamp. Timestamps are stored in
//! the canonical fixed-width RFC 3339 form, so SQLite's lexicographic
//! ordering and range comparisons are chronological.
//!
//! The connection sits behind a mutex (`rusqlite::Connection` is not
//! `Sync`); SQLite gives per-statement atomicity, so each upsert is
//! all-or-nothing.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use telvault_core::{
    canonical_timestamp, ArchiveQuery, Error, ExpiredEntry, IndexSnapshot, IndexedEntry,
    MetadataIndex, Result,
};
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS archive_index (
    entry_id TEXT PRIMARY KEY,
    device_id TEXT NOT NULL,
    emotion TEXT NOT NULL,
    emotion_score REAL NOT NULL,
    confidence REAL NOT NULL,
    timestamp TEXT NOT NULL,
    edge_node_id TEXT NOT NULL,
    archive_path TEXT NOT NULL,
    checksum TEXT NOT NULL,
    compressed INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_device_timestamp ON archive_index(device_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_emotion_timestamp ON archive_index(emotion, timestamp);
CREATE INDEX IF NOT EXISTS idx_edge_node_timestamp ON archive_index(edge_node_id, timestamp);
";

const COLUMNS: &str = "entry_id, device_id, emotion, emotion_score, confidence, timestamp, \
                       edge_node_id, archive_path, checksum, compressed, size_bytes, created_at";

/// The durable metadata catalog, stored in a single SQLite database.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open (or create) the index at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(sql_err)?;
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        debug!(path = %path.display(), "primary index opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory index. For tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MetadataIndex for SqliteIndex {
    fn upsert(&self, entry: &IndexedEntry) -> Result<()> {
        let conn = self.conn.lock();

        // Same truncated id, different identity triple: refuse to silently
        // overwrite foreign data.
        let existing: Option<(String, String, String)> = conn
            .query_row(
                "SELECT device_id, timestamp, edge_node_id FROM archive_index WHERE entry_id = ?1",
                params![entry.entry_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(sql_err)?;
        if let Some((device, ts, edge)) = existing {
            let same = device == entry.device_id
                && ts == canonical_timestamp(entry.timestamp)
                && edge == entry.edge_node_id;
            if !same {
                return Err(Error::IdentityCollision {
                    entry_id: entry.entry_id.clone(),
                });
            }
        }

        conn.execute(
            "INSERT OR REPLACE INTO archive_index \
             (entry_id, device_id, emotion, emotion_score, confidence, timestamp, \
              edge_node_id, archive_path, checksum, compressed, size_bytes, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                entry.entry_id,
                entry.device_id,
                entry.emotion,
                entry.emotion_score,
                entry.confidence,
                canonical_timestamp(entry.timestamp),
                entry.edge_node_id,
                entry.archive_path,
                entry.checksum,
                entry.compressed as i64,
                entry.size_bytes as i64,
                canonical_timestamp(entry.created_at),
            ],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn get(&self, entry_id: &str) -> Result<Option<IndexedEntry>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM archive_index WHERE entry_id = ?1", COLUMNS),
                params![entry_id],
                row_to_raw,
            )
            .optional()
            .map_err(sql_err)?;
        raw.map(RawRow::into_entry).transpose()
    }

    fn query(&self, query: &ArchiveQuery) -> Result<Vec<IndexedEntry>> {
        let mut sql = format!("SELECT {} FROM archive_index WHERE 1=1", COLUMNS);
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(start) = query.start {
            sql.push_str(" AND timestamp >= ?");
            args.push(SqlValue::Text(canonical_timestamp(start)));
        }
        if let Some(end) = query.end {
            sql.push_str(" AND timestamp <= ?");
            args.push(SqlValue::Text(canonical_timestamp(end)));
        }
        push_set_filter(&mut sql, &mut args, "device_id", query.device_ids.as_deref());
        push_set_filter(&mut sql, &mut args, "emotion", query.emotions.as_deref());
        push_set_filter(
            &mut sql,
            &mut args,
            "edge_node_id",
            query.edge_node_ids.as_deref(),
        );

        sql.push_str(" AND confidence >= ? AND confidence <= ?");
        args.push(SqlValue::Real(query.min_confidence));
        args.push(SqlValue::Real(query.max_confidence));

        sql.push_str(" ORDER BY timestamp DESC LIMIT ?");
        args.push(SqlValue::Integer(query.limit as i64));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args), row_to_raw)
            .map_err(sql_err)?;

        let mut entries = Vec::new();
        for raw in rows {
            entries.push(raw.map_err(sql_err)?.into_entry()?);
        }
        Ok(entries)
    }

    fn remove(&self, entry_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "DELETE FROM archive_index WHERE entry_id = ?1",
                params![entry_id],
            )
            .map_err(sql_err)?;
        Ok(changed > 0)
    }

    fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExpiredEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT entry_id, archive_path FROM archive_index WHERE timestamp < ?1")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![canonical_timestamp(cutoff)], |row| {
                Ok(ExpiredEntry {
                    entry_id: row.get(0)?,
                    archive_path: row.get(1)?,
                })
            })
            .map_err(sql_err)?;

        let mut expired = Vec::new();
        for row in rows {
            expired.push(row.map_err(sql_err)?);
        }
        Ok(expired)
    }

    fn snapshot(&self) -> Result<IndexSnapshot> {
        let conn = self.conn.lock();
        let (entries, total_bytes): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) FROM archive_index",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(sql_err)?;
        Ok(IndexSnapshot {
            entries: entries as u64,
            total_bytes: total_bytes as u64,
        })
    }
}

/// Append `AND col IN (?, ?, ...)` when the filter set is present and
/// non-empty; an empty set means "no filter on this dimension".
fn push_set_filter(
    sql: &mut String,
    args: &mut Vec<SqlValue>,
    column: &str,
    values: Option<&[String]>,
) {
    if let Some(values) = values {
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        sql.push_str(&format!(" AND {} IN ({})", column, placeholders));
        for v in values {
            args.push(SqlValue::Text(v.clone()));
        }
    }
}

/// One row as raw SQLite values, before timestamp parsing.
struct RawRow {
    entry_id: String,
    device_id: String,
    emotion: String,
    emotion_score: f64,
    confidence: f64,
    timestamp: String,
    edge_node_id: String,
    archive_path: String,
    checksum: String,
    compressed: i64,
    size_bytes: i64,
    created_at: String,
}

fn row_to_raw(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        entry_id: row.get(0)?,
        device_id: row.get(1)?,
        emotion: row.get(2)?,
        emotion_score: row.get(3)?,
        confidence: row.get(4)?,
        timestamp: row.get(5)?,
        edge_node_id: row.get(6)?,
        archive_path: row.get(7)?,
        checksum: row.get(8)?,
        compressed: row.get(9)?,
        size_bytes: row.get(10)?,
        created_at: row.get(11)?,
    })
}

impl RawRow {
    fn into_entry(self) -> Result<IndexedEntry> {
        Ok(IndexedEntry {
            timestamp: parse_ts(&self.timestamp)?,
            created_at: parse_ts(&self.created_at)?,
            entry_id: self.entry_id,
            device_id: self.device_id,
            emotion: self.emotion,
            emotion_score: self.emotion_score,
            confidence: self.confidence,
            edge_node_id: self.edge_node_id,
            archive_path: self.archive_path,
            checksum: self.checksum,
            compressed: self.compressed != 0,
            size_bytes: self.size_bytes as u64,
        })
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Index(format!("stored timestamp '{}': {}", raw, e)))
}

fn sql_err(e: rusqlite::Error) -> Error {
    Error::Index(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, device: &str, emotion: &str, secs: u32) -> IndexedEntry {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, secs).unwrap();
        IndexedEntry {
            entry_id: id.to_string(),
            device_id: device.to_string(),
            emotion: emotion.to_string(),
            emotion_score: 0.8,
            confidence: 0.9,
            timestamp: ts,
            edge_node_id: "e1".to_string(),
            archive_path: format!("/archive/{}.json", id),
            checksum: "00".repeat(32),
            compressed: false,
            size_bytes: 128,
            created_at: ts,
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let index = SqliteIndex::in_memory().unwrap();
        let e = entry("aaaa", "d1", "calm", 0);
        index.upsert(&e).unwrap();
        assert_eq!(index.get("aaaa").unwrap(), Some(e));
    }

    #[test]
    fn get_absent_is_none() {
        let index = SqliteIndex::in_memory().unwrap();
        assert_eq!(index.get("missing").unwrap(), None);
    }

    #[test]
    fn upsert_same_identity_replaces_not_duplicates() {
        let index = SqliteIndex::in_memory().unwrap();
        let mut e = entry("aaaa", "d1", "calm", 0);
        index.upsert(&e).unwrap();
        e.emotion = "joy".to_string();
        index.upsert(&e).unwrap();

        assert_eq!(index.snapshot().unwrap().entries, 1);
        assert_eq!(index.get("aaaa").unwrap().unwrap().emotion, "joy");
    }

    #[test]
    fn upsert_detects_identity_collision() {
        let index = SqliteIndex::in_memory().unwrap();
        index.upsert(&entry("aaaa", "d1", "calm", 0)).unwrap();

        let foreign = entry("aaaa", "other-device", "calm", 0);
        let err = index.upsert(&foreign).unwrap_err();
        assert!(matches!(err, Error::IdentityCollision { .. }));
        // The original row is untouched.
        assert_eq!(index.get("aaaa").unwrap().unwrap().device_id, "d1");
    }

    #[test]
    fn query_orders_by_timestamp_descending() {
        let index = SqliteIndex::in_memory().unwrap();
        index.upsert(&entry("a", "d1", "calm", 1)).unwrap();
        index.upsert(&entry("b", "d1", "calm", 3)).unwrap();
        index.upsert(&entry("c", "d1", "calm", 2)).unwrap();

        let got = index.query(&ArchiveQuery::default()).unwrap();
        let ids: Vec<_> = got.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn query_respects_limit() {
        let index = SqliteIndex::in_memory().unwrap();
        for i in 0..10 {
            index
                .upsert(&entry(&format!("id{}", i), "d1", "calm", i))
                .unwrap();
        }
        let got = index
            .query(&ArchiveQuery {
                limit: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].entry_id, "id9");
    }

    #[test]
    fn set_filters_are_or_within_and_across() {
        let index = SqliteIndex::in_memory().unwrap();
        index.upsert(&entry("a", "d1", "calm", 0)).unwrap();
        index.upsert(&entry("b", "d2", "calm", 1)).unwrap();
        index.upsert(&entry("c", "d1", "joy", 2)).unwrap();

        let got = index
            .query(&ArchiveQuery {
                device_ids: Some(vec!["d1".to_string(), "d2".to_string()]),
                emotions: Some(vec!["calm".to_string()]),
                ..Default::default()
            })
            .unwrap();
        let ids: Vec<_> = got.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn empty_filter_set_means_no_filter() {
        let index = SqliteIndex::in_memory().unwrap();
        index.upsert(&entry("a", "d1", "calm", 0)).unwrap();
        let got = index
            .query(&ArchiveQuery {
                device_ids: Some(vec![]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn time_window_bounds_are_inclusive() {
        let index = SqliteIndex::in_memory().unwrap();
        index.upsert(&entry("a", "d1", "calm", 10)).unwrap();
        index.upsert(&entry("b", "d1", "calm", 20)).unwrap();
        index.upsert(&entry("c", "d1", "calm", 30)).unwrap();

        let got = index
            .query(&ArchiveQuery {
                start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap()),
                end: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 20).unwrap()),
                ..Default::default()
            })
            .unwrap();
        let ids: Vec<_> = got.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn confidence_band_filters() {
        let index = SqliteIndex::in_memory().unwrap();
        let mut low = entry("low", "d1", "calm", 0);
        low.confidence = 0.2;
        let mut high = entry("high", "d1", "calm", 1);
        high.confidence = 0.95;
        index.upsert(&low).unwrap();
        index.upsert(&high).unwrap();

        let got = index
            .query(&ArchiveQuery {
                min_confidence: 0.5,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].entry_id, "high");
    }

    #[test]
    fn remove_reports_existence() {
        let index = SqliteIndex::in_memory().unwrap();
        index.upsert(&entry("a", "d1", "calm", 0)).unwrap();
        assert!(index.remove("a").unwrap());
        assert!(!index.remove("a").unwrap());
        assert_eq!(index.get("a").unwrap(), None);
    }

    #[test]
    fn expired_returns_only_strictly_older_rows() {
        let index = SqliteIndex::in_memory().unwrap();
        index.upsert(&entry("old", "d1", "calm", 0)).unwrap();
        index.upsert(&entry("edge", "d1", "calm", 30)).unwrap();
        index.upsert(&entry("new", "d1", "calm", 59)).unwrap();

        let cutoff = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 30).unwrap();
        let expired = index.expired(cutoff).unwrap();
        let ids: Vec<_> = expired.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(ids, ["old"]);
    }

    #[test]
    fn snapshot_sums_sizes() {
        let index = SqliteIndex::in_memory().unwrap();
        index.upsert(&entry("a", "d1", "calm", 0)).unwrap();
        index.upsert(&entry("b", "d1", "calm", 1)).unwrap();
        let snap = index.snapshot().unwrap();
        assert_eq!(snap.entries, 2);
        assert_eq!(snap.total_bytes, 256);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("index.db");
        {
            let index = SqliteIndex::open(&db).unwrap();
            index.upsert(&entry("a", "d1", "calm", 0)).unwrap();
        }
        let index = SqliteIndex::open(&db).unwrap();
        assert!(index.get("a").unwrap().is_some());
    }

    #[test]
    fn subsecond_timestamps_order_correctly() {
        let index = SqliteIndex::in_memory().unwrap();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut early = entry("early", "d1", "calm", 0);
        early.timestamp = base + chrono::Duration::microseconds(250_000);
        let mut late = entry("late", "d1", "calm", 0);
        late.timestamp = base + chrono::Duration::seconds(1);
        index.upsert(&early).unwrap();
        index.upsert(&late).unwrap();

        let got = index.query(&ArchiveQuery::default()).unwrap();
        let ids: Vec<_> = got.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(ids, ["late", "early"]);
    }
}
