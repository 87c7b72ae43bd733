//! Error types for storage operations.
//!
//! [`StorageError`] is the single error type returned by the
//! [`BlockStorage`](crate::BlockStorage) and [`TestFile`](crate::TestFile)
//! traits. The test engine does not interpret variants beyond "it failed";
//! they exist so logs can say *why* a transfer stopped.

use thiserror::Error;

/// Errors returned by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The named artifact does not exist.
    #[error("not found: {name}")]
    NotFound {
        /// Artifact name as passed to the storage.
        name: String,
    },

    /// The artifact name is not a plain file name.
    #[error("invalid artifact name `{name}`: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The medium or handle is no longer usable (card removed, handle closed).
    #[error("storage not ready: {reason}")]
    NotReady {
        /// What made the storage unusable.
        reason: String,
    },

    /// A read or write moved fewer bytes than requested.
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer {
        /// Bytes requested.
        expected: usize,
        /// Bytes actually transferred.
        actual: usize,
    },

    /// A fault injected by a [`FaultPlan`](crate::FaultPlan).
    #[error("injected fault during {op}")]
    Injected {
        /// The operation that was made to fail (`"open-write"`, `"write"`, ...).
        op: &'static str,
    },

    /// An I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
