//! # Telvault
//!
//! Embedded archival storage engine for sensor-derived event streams.
//!
//! Telvault durably retains time-stamped events under deterministic,
//! content-derived identities, answers time-range and categorical filter
//! queries from a structured index, verifies bodies against checksums on
//! every read, and reclaims space once a retention window elapses.
//!
//! ## Quick Start
//!
//! ```ignore
//! use telvault::prelude::*;
//!
//! // Open an archive
//! let vault = Telvault::open("./my-archive")?;
//!
//! // Archive an event
//! let id = vault.archive(&event)?;
//!
//! // Query metadata, newest first
//! let entries = vault.query(&ArchiveQuery {
//!     device_ids: Some(vec!["d1".into()]),
//!     ..Default::default()
//! })?;
//!
//! // Retrieve the verified body
//! let entry = vault.retrieve(&id)?;
//!
//! // Reclaim space past the retention window
//! let removed = vault.cleanup(None)?;
//! ```
//!
//! ## Tiers
//!
//! - **Primary index** — a SQLite catalog of entry metadata, the durable
//!   source of truth together with the body file tree.
//! - **Body store** — partitioned `year/month/day/device/emotion` files,
//!   optionally zstd-compressed, written atomically.
//! - **Hot cache** — a TTL-bound metadata fast path; strictly derived.
//! - **Backup replica** — a best-effort metadata mirror, never read on the
//!   normal retrieve path.
//!
//! Cache and backup failures never fail an archive operation; the index
//! upsert is the durability commit point.

#![warn(missing_docs)]

mod database;

pub mod prelude;

// Re-export main entry points
pub use database::{Telvault, TelvaultBuilder};

// Re-export the core vocabulary
pub use telvault_core::{
    ArchiveConfig, ArchiveQuery, ArchiveStats, BackupReplica, Cache, Error, IndexedEntry,
    MetadataIndex, Result, RetrievedEntry, SensorEvent,
};

// Re-export the default tier implementations for substitution in tests
// and custom deployments
pub use telvault_engine::{FileBackup, NullBackup, TtlCache};
pub use telvault_storage::SqliteIndex;
