//! The [`BlockStorage`] / [`TestFile`] traits: the boundary between the
//! test engine and the card under test.
//!
//! | Operation        | Method                             |
//! |------------------|------------------------------------|
//! | open for write   | [`BlockStorage::open_for_write`]   |
//! | open for read    | [`BlockStorage::open_for_read`]    |
//! | delete           | [`BlockStorage::remove`]           |
//! | write chunk      | [`TestFile::write`]                |
//! | read chunk       | [`TestFile::read`]                 |
//! | ready check      | [`TestFile::is_ready`]             |
//! | close            | [`TestFile::close`]                |

use crate::error::StorageError;

/// A storage medium that can hold the test artifact.
///
/// # Object safety
///
/// This trait is object-safe. The engine holds a `Box<dyn BlockStorage>` and
/// moves it onto its worker thread, hence the `Send` bound.
pub trait BlockStorage: Send {
    /// Create (or truncate) `name` and open it for sequential writing.
    fn open_for_write(&mut self, name: &str) -> Result<Box<dyn TestFile + '_>, StorageError>;

    /// Open an existing `name` for sequential reading from the start.
    fn open_for_read(&mut self, name: &str) -> Result<Box<dyn TestFile + '_>, StorageError>;

    /// Delete `name`.
    fn remove(&mut self, name: &str) -> Result<(), StorageError>;

    /// Return `true` if `name` currently exists.
    fn exists(&self, name: &str) -> bool;

    /// Short human-readable description for logs (e.g. the root path).
    fn describe(&self) -> String;
}

/// An open handle to the test artifact.
///
/// Transfers are all-or-nothing per call: `write` either stores the whole
/// buffer or fails, `read` either fills the whole buffer or fails.
pub trait TestFile {
    /// Return `false` once the handle can no longer transfer data.
    fn is_ready(&self) -> bool;

    /// Append `buf` at the current position.
    fn write(&mut self, buf: &[u8]) -> Result<(), StorageError>;

    /// Fill `buf` from the current position.
    ///
    /// Hitting end-of-file before `buf` is full yields
    /// [`StorageError::ShortTransfer`].
    fn read(&mut self, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Flush and release the handle. Calling it twice is a no-op.
    fn close(&mut self) -> Result<(), StorageError>;
}
