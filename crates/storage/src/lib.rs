//! Durable tiers for Telvault: the body file tree and the primary index.
//!
//! This crate implements:
//! - `PathAllocator`: partitioned body locations (`year/month/day/device/emotion`)
//! - `BodyCodec`: canonical serialization, checksums, zstd, atomic writes
//! - `FsBodyStore`: the cold tier composed from the two above
//! - `SqliteIndex`: the durable metadata catalog

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod body;
pub mod codec;
pub mod index;
pub mod paths;

pub use body::{FsBodyStore, StoredBody};
pub use codec::{BodyCodec, EncodedBody};
pub use index::SqliteIndex;
pub use paths::{PathAllocator, COMPRESSED_EXTENSION, PLAIN_EXTENSION};
