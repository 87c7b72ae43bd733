//! Snapshot handoff between the worker and the caller.
//!
//! The worker publishes into a [`ProgressCell`] after every chunk and on every
//! state change; the caller copies a whole [`Progress`] out under the same
//! lock, so a snapshot is never torn across fields.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::result::{Direction, TestResult};
use crate::stats::{DirectionStats, MismatchInfo, Stats};

/// Where the orchestrator is in its run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "result", rename_all = "kebab-case")]
pub enum RunState {
    /// Created, not started.
    #[default]
    Idle,
    /// Write phase in progress.
    Writing,
    /// Write phase accepted, read phase about to start.
    ReadPending,
    /// Read phase in progress.
    Reading,
    /// Finished with a terminal result.
    Done(TestResult),
}

impl RunState {
    /// The run's result: `Running` until `Done`.
    #[must_use]
    pub const fn result(self) -> TestResult {
        match self {
            Self::Done(result) => result,
            _ => TestResult::Running,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Writing => write!(f, "writing"),
            Self::ReadPending => write!(f, "read pending"),
            Self::Reading => write!(f, "reading"),
            Self::Done(result) => write!(f, "done ({result})"),
        }
    }
}

/// A consistent view of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Orchestrator state.
    pub state: RunState,
    /// Measurements so far.
    pub stats: Stats,
    /// Byte target per direction.
    pub target_bytes: u64,
}

impl Progress {
    /// Bytes moved so far across both phases, out of `2 * target_bytes`.
    #[must_use]
    pub const fn bytes_done(&self) -> u64 {
        self.stats.write.bytes + self.stats.read.bytes
    }
}

/// Mutex-guarded [`Progress`] shared by worker and caller.
#[derive(Debug, Default)]
pub struct ProgressCell {
    inner: Mutex<Progress>,
}

impl ProgressCell {
    /// A cell for a run targeting `target_bytes` per direction.
    #[must_use]
    pub fn new(target_bytes: u64, tick_frequency: u64) -> Self {
        let mut progress = Progress {
            target_bytes,
            ..Progress::default()
        };
        progress.stats.tick_frequency = tick_frequency;
        Self {
            inner: Mutex::new(progress),
        }
    }

    /// Copy out the current progress.
    #[must_use]
    pub fn snapshot(&self) -> Progress {
        *self.lock()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.lock().state
    }

    pub(crate) fn set_state(&self, state: RunState) {
        self.lock().state = state;
    }

    pub(crate) fn publish(&self, direction: Direction, stats: &DirectionStats) {
        *self.lock().stats.direction_mut(direction) = *stats;
    }

    pub(crate) fn set_mismatch(&self, info: MismatchInfo) {
        self.lock().stats.mismatch = Some(info);
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
