//! [`FsStorage`]: the artifact lives as a regular file under a directory,
//! normally the mount point of the card under test.
//!
//! On Linux the artifact's cached pages are dropped once the write handle is
//! synced and again when a read handle opens, so the read phase goes to the
//! card instead of the page cache the write just filled.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::storage::{BlockStorage, TestFile};

/// Storage backed by a directory on a mounted filesystem.
#[derive(Clone, Debug)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Use `root` as the directory that holds the artifact.
    ///
    /// The directory is not created; a missing root surfaces as an open
    /// failure when the test starts.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding the artifact.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() {
            return Err(StorageError::InvalidName {
                name: name.to_owned(),
                reason: "empty",
            });
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StorageError::InvalidName {
                name: name.to_owned(),
                reason: "must be a plain file name",
            });
        }
        Ok(self.root.join(name))
    }
}

impl BlockStorage for FsStorage {
    fn open_for_write(&mut self, name: &str) -> Result<Box<dyn TestFile + '_>, StorageError> {
        let path = self.artifact_path(name)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        tracing::debug!(path = %path.display(), "opened artifact for writing");
        Ok(Box::new(FsFile {
            file: Some(file),
            root: self.root.clone(),
            writable: true,
        }))
    }

    fn open_for_read(&mut self, name: &str) -> Result<Box<dyn TestFile + '_>, StorageError> {
        let path = self.artifact_path(name)?;
        let file = File::open(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound {
                    name: name.to_owned(),
                }
            } else {
                StorageError::Io(e)
            }
        })?;
        if let Err(e) = drop_cached_pages(&file) {
            tracing::warn!(error = %e, "could not drop cached pages; reads may not reach the card");
        }
        tracing::debug!(path = %path.display(), "opened artifact for reading");
        Ok(Box::new(FsFile {
            file: Some(file),
            root: self.root.clone(),
            writable: false,
        }))
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        let path = self.artifact_path(name)?;
        std::fs::remove_file(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound {
                    name: name.to_owned(),
                }
            } else {
                StorageError::Io(e)
            }
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.artifact_path(name).is_ok_and(|p| p.is_file())
    }

    fn describe(&self) -> String {
        format!("fs:{}", self.root.display())
    }
}

struct FsFile {
    file: Option<File>,
    root: PathBuf,
    writable: bool,
}

impl FsFile {
    fn handle(&mut self) -> Result<&mut File, StorageError> {
        self.file.as_mut().ok_or_else(|| StorageError::NotReady {
            reason: "handle already closed".to_owned(),
        })
    }
}

impl TestFile for FsFile {
    fn is_ready(&self) -> bool {
        // A yanked card takes its mount point with it.
        self.file.is_some() && self.root.is_dir()
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), StorageError> {
        self.handle()?.write_all(buf)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), StorageError> {
        let file = self.handle()?;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(StorageError::Io(e)),
            }
        }
        if filled < buf.len() {
            return Err(StorageError::ShortTransfer {
                expected: buf.len(),
                actual: filled,
            });
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        if self.writable {
            file.flush()?;
            file.sync_all()?;
            if let Err(e) = drop_cached_pages(&file) {
                tracing::warn!(error = %e, "could not drop cached pages; reads may not reach the card");
            }
        }
        Ok(())
    }
}

/// Evicts the file's clean pages from the page cache.
#[cfg(target_os = "linux")]
fn drop_cached_pages(file: &File) -> std::io::Result<()> {
    rustix::fs::fadvise(file, 0, None, rustix::fs::Advice::DontNeed)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
#[allow(clippy::unnecessary_wraps)]
fn drop_cached_pages(_file: &File) -> std::io::Result<()> {
    Ok(())
}
