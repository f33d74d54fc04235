//! Convenient imports for Telvault.
//!
//! This module re-exports the most commonly used types so you can get
//! started with a single import:
//!
//! ```ignore
//! use telvault::prelude::*;
//!
//! let vault = Telvault::open("./my-archive")?;
//! let id = vault.archive(&event)?;
//! ```

// Main entry point
pub use crate::database::{Telvault, TelvaultBuilder};

// Error handling
pub use telvault_core::{Error, Result};

// Core types
pub use telvault_core::{
    ArchiveConfig, ArchiveQuery, ArchiveStats, IndexedEntry, RetrievedEntry, SensorEvent,
};

// Tier contracts, for substitution in tests
pub use telvault_core::{BackupReplica, Cache, MetadataIndex};
