//! Shared helpers for sdprobe-core integration tests.

use std::sync::Arc;

use sdprobe_core::{Backends, CancelToken, StepClock};
use sdprobe_storage::{BlockStorage, MemStorage, StorageError, TestFile};

/// Backends over a clone of `storage` with a 1 MHz step clock.
pub fn mem_backends(storage: &MemStorage) -> Backends {
    Backends::new(Box::new(storage.clone())).with_clock(Arc::new(StepClock::new(7, 1_000_000)))
}

/// Storage wrapper that requests cancellation once `after_writes` chunk
/// writes have completed on a write handle.
pub struct CancellingStorage {
    pub inner: MemStorage,
    pub cancel: CancelToken,
    pub after_writes: u64,
}

impl BlockStorage for CancellingStorage {
    fn open_for_write(&mut self, name: &str) -> Result<Box<dyn TestFile + '_>, StorageError> {
        let file = self.inner.open_for_write(name)?;
        Ok(Box::new(CancellingFile {
            file,
            cancel: self.cancel.clone(),
            remaining: self.after_writes,
        }))
    }

    fn open_for_read(&mut self, name: &str) -> Result<Box<dyn TestFile + '_>, StorageError> {
        self.inner.open_for_read(name)
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        self.inner.remove(name)
    }

    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }

    fn describe(&self) -> String {
        format!("cancelling({})", self.inner.describe())
    }
}

struct CancellingFile<'s> {
    file: Box<dyn TestFile + 's>,
    cancel: CancelToken,
    remaining: u64,
}

impl TestFile for CancellingFile<'_> {
    fn is_ready(&self) -> bool {
        self.file.is_ready()
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), StorageError> {
        self.file.write(buf)?;
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.cancel.cancel();
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), StorageError> {
        self.file.read(buf)
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.file.close()
    }
}
