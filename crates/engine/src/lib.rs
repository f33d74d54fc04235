//! Archive engine for Telvault.
//!
//! This crate composes the storage tiers into the public operations:
//! - `ArchiveEngine`: orchestrates archive/retrieve/query/cleanup
//! - `TtlCache`: the in-process hot tier
//! - `FileBackup` / `NullBackup`: backup replica adapters
//! - `sweeper`: the retention sweep

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archiver;
pub mod backup;
pub mod cache;
pub mod sweeper;

pub use archiver::ArchiveEngine;
pub use backup::{FileBackup, NullBackup};
pub use cache::TtlCache;
pub use sweeper::sweep;
