//! Phase executor: one direction of transfer, chunk by chunk.
//!
//! A phase allocates a single chunk buffer, opens the artifact, and loops
//! while it is not cancelled, the file is ready, and the byte target has not
//! been reached. Each transfer call is timed individually. A failed transfer
//! ends the loop; the phase reports what it managed and leaves classification
//! to the orchestrator.
//!
//! The artifact handle is wrapped in [`OpenArtifact`], which closes it on
//! every exit path. The buffer is dropped when the phase returns, before the
//! next phase allocates its own.

use std::ops::{Deref, DerefMut};

use sdprobe_storage::{BlockStorage, StorageError, TestFile};

use crate::buffer::ChunkAllocator;
use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::pattern::{self, LfsrState, WORD_BYTES};
use crate::progress::ProgressCell;
use crate::result::Direction;
use crate::stats::{DirectionStats, MismatchInfo};

/// A phase could not start transferring.
#[derive(Debug)]
pub enum PhaseFault {
    /// The chunk buffer could not be allocated.
    HeapExhausted,
    /// The artifact could not be opened.
    OpenFailed(StorageError),
}

/// What a read phase observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Read-direction measurements.
    pub stats: DirectionStats,
    /// First verification failure; the phase stopped at that chunk.
    pub mismatch: Option<MismatchInfo>,
}

/// Runs write and read phases against one storage.
pub struct PhaseExecutor<'a> {
    storage: &'a mut dyn BlockStorage,
    clock: &'a dyn Clock,
    allocator: &'a dyn ChunkAllocator,
    cancel: &'a CancelToken,
    progress: &'a ProgressCell,
    file_name: &'a str,
    chunk_size: usize,
    target_bytes: u64,
}

impl<'a> PhaseExecutor<'a> {
    /// Bind an executor to its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: &'a mut dyn BlockStorage,
        clock: &'a dyn Clock,
        allocator: &'a dyn ChunkAllocator,
        cancel: &'a CancelToken,
        progress: &'a ProgressCell,
        file_name: &'a str,
        chunk_size: usize,
        target_bytes: u64,
    ) -> Self {
        Self {
            storage,
            clock,
            allocator,
            cancel,
            progress,
            file_name,
            chunk_size,
            target_bytes,
        }
    }

    /// Write the pattern seeded with `seed` until the target is reached or
    /// the loop is stopped.
    ///
    /// # Errors
    /// [`PhaseFault`] if the buffer or the artifact could not be obtained; no
    /// data was transferred in that case.
    pub fn write(&mut self, seed: LfsrState) -> Result<DirectionStats, PhaseFault> {
        let _span = tracing::info_span!("phase", direction = %Direction::Write).entered();

        let mut buffer = self.allocate()?;
        let handle = self
            .storage
            .open_for_write(self.file_name)
            .map_err(|e| open_failed(Direction::Write, e))?;
        let mut file = OpenArtifact::new(handle, Direction::Write);

        let mut state = seed;
        let mut stats = DirectionStats::default();
        let start = self.clock.now();
        while !self.cancel.is_cancelled() && file.is_ready() && stats.bytes < self.target_bytes {
            pattern::fill_bytes(&mut state, &mut buffer);

            let t0 = self.clock.now();
            if let Err(error) = file.write(&buffer) {
                tracing::warn!(chunk = stats.count, %error, "chunk write failed");
                break;
            }
            let ticks = self.clock.now().wrapping_sub(t0);

            stats.record_chunk(buffer.len(), ticks);
            self.progress.publish(Direction::Write, &stats);
            tracing::trace!(chunk = stats.count - 1, ticks, "chunk written");
        }
        drop(file);
        stats.phase_ticks = self.clock.now().wrapping_sub(start);
        self.progress.publish(Direction::Write, &stats);

        tracing::info!(
            bytes = stats.bytes,
            chunks = stats.count,
            cancelled = self.cancel.is_cancelled(),
            "write phase finished"
        );
        Ok(stats)
    }

    /// Read the artifact back, verifying it against the pattern seeded with
    /// `seed`. Stops at the first mismatching chunk.
    ///
    /// # Errors
    /// [`PhaseFault`] if the buffer or the artifact could not be obtained; no
    /// data was transferred in that case.
    pub fn read(&mut self, seed: LfsrState) -> Result<ReadOutcome, PhaseFault> {
        let _span = tracing::info_span!("phase", direction = %Direction::Read).entered();

        let mut buffer = self.allocate()?;
        let handle = self
            .storage
            .open_for_read(self.file_name)
            .map_err(|e| open_failed(Direction::Read, e))?;
        let mut file = OpenArtifact::new(handle, Direction::Read);

        let mut state = seed;
        let mut stats = DirectionStats::default();
        let mut mismatch = None;
        let start = self.clock.now();
        while !self.cancel.is_cancelled() && file.is_ready() && stats.bytes < self.target_bytes {
            let t0 = self.clock.now();
            if let Err(error) = file.read(&mut buffer) {
                tracing::warn!(chunk = stats.count, %error, "chunk read failed");
                break;
            }
            let ticks = self.clock.now().wrapping_sub(t0);

            let chunk = stats.count;
            stats.record_chunk(buffer.len(), ticks);
            self.progress.publish(Direction::Read, &stats);
            tracing::trace!(chunk, ticks, "chunk read");

            if let Some(bad) = pattern::check_bytes(&mut state, &buffer) {
                let info = MismatchInfo {
                    chunk,
                    word: bad.index,
                    byte_offset: chunk * self.chunk_size as u64 + (bad.index * WORD_BYTES) as u64,
                    expected: bad.expected,
                    actual: bad.actual,
                };
                tracing::error!(
                    chunk,
                    word = bad.index,
                    byte_offset = info.byte_offset,
                    expected = format_args!("{:#010x}", bad.expected),
                    actual = format_args!("{:#010x}", bad.actual),
                    "read-back mismatch"
                );
                self.progress.set_mismatch(info);
                mismatch = Some(info);
                break;
            }
        }
        drop(file);
        stats.phase_ticks = self.clock.now().wrapping_sub(start);
        self.progress.publish(Direction::Read, &stats);

        tracing::info!(
            bytes = stats.bytes,
            chunks = stats.count,
            verified = mismatch.is_none(),
            cancelled = self.cancel.is_cancelled(),
            "read phase finished"
        );
        Ok(ReadOutcome { stats, mismatch })
    }

    fn allocate(&self) -> Result<Vec<u8>, PhaseFault> {
        self.allocator.allocate(self.chunk_size).ok_or_else(|| {
            tracing::warn!(chunk_size = self.chunk_size, "chunk buffer allocation failed");
            PhaseFault::HeapExhausted
        })
    }
}

fn open_failed(direction: Direction, error: StorageError) -> PhaseFault {
    tracing::warn!(%direction, %error, "opening artifact failed");
    PhaseFault::OpenFailed(error)
}

/// An open artifact that is closed when it goes out of scope.
struct OpenArtifact<'s> {
    file: Box<dyn TestFile + 's>,
    direction: Direction,
}

impl<'s> OpenArtifact<'s> {
    fn new(file: Box<dyn TestFile + 's>, direction: Direction) -> Self {
        Self { file, direction }
    }
}

impl<'s> Deref for OpenArtifact<'s> {
    type Target = dyn TestFile + 's;

    fn deref(&self) -> &Self::Target {
        self.file.as_ref()
    }
}

impl DerefMut for OpenArtifact<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.file.as_mut()
    }
}

impl Drop for OpenArtifact<'_> {
    fn drop(&mut self) {
        if let Err(error) = self.file.close() {
            tracing::warn!(direction = %self.direction, %error, "closing artifact failed");
        }
    }
}
