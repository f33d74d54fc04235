//! Unified error types for Telvault.
//!
//! One canonical error enum covers every tier. The durability path (body
//! write, index upsert) propagates errors to the caller; best-effort tiers
//! (hot cache, backup replica) produce `Error::Dependency`, which the engine
//! logs and swallows rather than failing the operation.

use thiserror::Error;

/// All Telvault errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input event, rejected before any write.
    #[error("validation: {0}")]
    Validation(String),

    /// Body write failed; nothing was made durable.
    #[error("storage write: {0}")]
    StorageWrite(String),

    /// Primary index operation failed.
    #[error("index: {0}")]
    Index(String),

    /// Identity absent from the primary index.
    #[error("not found: {0}")]
    NotFound(String),

    /// The index has a row but the body file is gone, e.g. a retention
    /// sweep removed it between the index lookup and the file open.
    #[error("missing body for {entry_id} at {path}")]
    MissingBody {
        /// The entry whose body is missing
        entry_id: String,
        /// Path the index pointed at
        path: String,
    },

    /// Checksum mismatch on read. The body is never returned.
    #[error("corrupted body for {entry_id}: expected checksum {expected}, got {actual}")]
    Corruption {
        /// The entry that failed verification
        entry_id: String,
        /// Checksum recorded in the index
        expected: String,
        /// Checksum recomputed from the body on disk
        actual: String,
    },

    /// Two distinct identity triples hashed to the same truncated id.
    #[error("identity collision on {entry_id}")]
    IdentityCollision {
        /// The contested id
        entry_id: String,
    },

    /// A best-effort dependency (cache, backup) failed. Never fatal to the
    /// archive operation; the engine logs it and continues.
    #[error("dependency: {0}")]
    Dependency(String),

    /// Serialization error
    #[error("serialization: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Telvault operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a not-found error (absent from the index, or
    /// indexed but the body file is gone).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::MissingBody { .. })
    }

    /// Check if this is a corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption { .. })
    }

    /// Check if this error may be swallowed after logging.
    ///
    /// Only failures from best-effort tiers qualify; everything else must
    /// be reported to the caller.
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, Error::Dependency(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
