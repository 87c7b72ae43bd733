//! [`MemStorage`]: a RAM-backed store with deterministic fault injection.
//!
//! Cloning a `MemStorage` yields another handle to the same store, so a test
//! can hand one clone to the engine and keep another to inspect what was
//! written (or whether the artifact was deleted) afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::StorageError;
use crate::storage::{BlockStorage, TestFile};

/// Faults to inject into a [`MemStorage`].
///
/// Transfer indices are zero-based and count calls on a single handle, so
/// `fail_write_at: Some(3)` lets three writes succeed and fails the fourth.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Fail `open_for_write`.
    pub fail_open_write: bool,
    /// Fail `open_for_read`.
    pub fail_open_read: bool,
    /// Fail the write call with this index.
    pub fail_write_at: Option<u64>,
    /// Fail the read call with this index.
    pub fail_read_at: Option<u64>,
    /// Report not-ready after this many successful transfers on a handle
    /// (simulates the card being pulled mid-run).
    pub eject_after: Option<u64>,
    /// Flip every bit of the stored byte at this offset when it is read back.
    pub corrupt_byte_at: Option<usize>,
    /// Drop this many bytes from the end of every write (silent truncation).
    pub truncate_writes_by: usize,
    /// Sleep this long inside every transfer call.
    pub latency: Option<Duration>,
    /// Fail `remove`.
    pub fail_remove: bool,
}

#[derive(Debug, Default)]
struct MemInner {
    files: HashMap<String, Vec<u8>>,
    faults: FaultPlan,
    write_calls: u64,
    read_calls: u64,
}

/// RAM-backed storage.
#[derive(Clone, Debug, Default)]
pub struct MemStorage {
    inner: Arc<Mutex<MemInner>>,
}

impl MemStorage {
    /// An empty store with no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store that injects `faults`.
    #[must_use]
    pub fn with_faults(faults: FaultPlan) -> Self {
        let storage = Self::default();
        storage.lock().faults = faults;
        storage
    }

    /// Replace the active fault plan.
    pub fn set_faults(&self, faults: FaultPlan) {
        self.lock().faults = faults;
    }

    /// A copy of the stored bytes for `name`.
    #[must_use]
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().files.get(name).cloned()
    }

    /// Store `bytes` under `name` directly, bypassing the trait.
    pub fn insert(&self, name: &str, bytes: Vec<u8>) {
        self.lock().files.insert(name.to_owned(), bytes);
    }

    /// Total write calls made across all handles.
    #[must_use]
    pub fn write_calls(&self) -> u64 {
        self.lock().write_calls
    }

    /// Total read calls made across all handles.
    #[must_use]
    pub fn read_calls(&self) -> u64 {
        self.lock().read_calls
    }

    fn lock(&self) -> MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlockStorage for MemStorage {
    fn open_for_write(&mut self, name: &str) -> Result<Box<dyn TestFile + '_>, StorageError> {
        let mut inner = self.lock();
        if inner.faults.fail_open_write {
            return Err(StorageError::Injected { op: "open-write" });
        }
        inner.files.insert(name.to_owned(), Vec::new());
        drop(inner);
        Ok(Box::new(MemFile::new(self.inner.clone(), name)))
    }

    fn open_for_read(&mut self, name: &str) -> Result<Box<dyn TestFile + '_>, StorageError> {
        let inner = self.lock();
        if inner.faults.fail_open_read {
            return Err(StorageError::Injected { op: "open-read" });
        }
        if !inner.files.contains_key(name) {
            return Err(StorageError::NotFound {
                name: name.to_owned(),
            });
        }
        drop(inner);
        Ok(Box::new(MemFile::new(self.inner.clone(), name)))
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if inner.faults.fail_remove {
            return Err(StorageError::Injected { op: "remove" });
        }
        inner
            .files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                name: name.to_owned(),
            })
    }

    fn exists(&self, name: &str) -> bool {
        self.lock().files.contains_key(name)
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}

struct MemFile {
    inner: Arc<Mutex<MemInner>>,
    name: String,
    position: usize,
    transfers: u64,
    closed: bool,
}

impl MemFile {
    fn new(inner: Arc<Mutex<MemInner>>, name: &str) -> Self {
        Self {
            inner,
            name: name.to_owned(),
            position: 0,
            transfers: 0,
            closed: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ejected(&self, faults: &FaultPlan) -> bool {
        faults.eject_after.is_some_and(|n| self.transfers >= n)
    }

    fn check_usable(&self, faults: &FaultPlan) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::NotReady {
                reason: "handle already closed".to_owned(),
            });
        }
        if self.ejected(faults) {
            return Err(StorageError::NotReady {
                reason: "medium removed".to_owned(),
            });
        }
        Ok(())
    }
}

impl TestFile for MemFile {
    fn is_ready(&self) -> bool {
        let inner = self.lock();
        !self.closed && !self.ejected(&inner.faults) && inner.files.contains_key(&self.name)
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), StorageError> {
        let latency = {
            let mut inner = self.lock();
            inner.write_calls += 1;
            self.check_usable(&inner.faults)?;
            if inner.faults.fail_write_at == Some(self.transfers) {
                return Err(StorageError::Injected { op: "write" });
            }
            let keep = buf.len().saturating_sub(inner.faults.truncate_writes_by);
            let file = inner
                .files
                .get_mut(&self.name)
                .ok_or_else(|| StorageError::NotReady {
                    reason: format!("`{}` vanished while open", self.name),
                })?;
            file.extend_from_slice(&buf[..keep]);
            inner.faults.latency
        };
        if let Some(d) = latency {
            std::thread::sleep(d);
        }
        self.transfers += 1;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), StorageError> {
        let latency = {
            let mut inner = self.lock();
            inner.read_calls += 1;
            self.check_usable(&inner.faults)?;
            if inner.faults.fail_read_at == Some(self.transfers) {
                return Err(StorageError::Injected { op: "read" });
            }
            let corrupt_at = inner.faults.corrupt_byte_at;
            let file = inner
                .files
                .get(&self.name)
                .ok_or_else(|| StorageError::NotReady {
                    reason: format!("`{}` vanished while open", self.name),
                })?;
            let available = file.len().saturating_sub(self.position);
            if available < buf.len() {
                return Err(StorageError::ShortTransfer {
                    expected: buf.len(),
                    actual: available,
                });
            }
            let start = self.position;
            buf.copy_from_slice(&file[start..start + buf.len()]);
            if let Some(offset) = corrupt_at
                && (start..start + buf.len()).contains(&offset)
            {
                buf[offset - start] ^= 0xFF;
            }
            inner.faults.latency
        };
        if let Some(d) = latency {
            std::thread::sleep(d);
        }
        self.position += buf.len();
        self.transfers += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.closed = true;
        Ok(())
    }
}
