//! Core types and contracts for Telvault.
//!
//! This crate defines the domain model shared by every tier of the archive:
//! the entry and query types, the unified error type, deterministic identity
//! derivation, configuration, and the traits the orchestrator depends on
//! (`MetadataIndex`, `Cache`, `BackupReplica`).
//!
//! Nothing in this crate touches the filesystem or any external service; the
//! concrete tiers live in `telvault-storage` and `telvault-engine`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod identity;
pub mod tiers;
pub mod types;

pub use config::ArchiveConfig;
pub use error::{Error, Result};
pub use identity::{entry_id, ENTRY_ID_LEN};
pub use tiers::{BackupReplica, Cache, ExpiredEntry, IndexSnapshot, MetadataIndex};
pub use types::{
    canonical_timestamp, ArchiveEntry, ArchiveQuery, ArchiveStats, IndexedEntry, RetrievedEntry,
    SensorEvent, DEFAULT_QUERY_LIMIT,
};
