//! Execution context: runs an [`Orchestrator`] on a background worker.
//!
//! The caller keeps a responsive surface: it can read a [`Progress`] snapshot
//! at any time, request cancellation, block for completion, or wait with a
//! periodic progress callback. Dropping the context cancels the run and joins
//! the worker, so no background work outlives it.
//!
//! Only one run may hold a [`TestSlot`] at a time; the slot is owned by the
//! caller and passed in explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::CoreError;
use crate::orchestrator::{Backends, Orchestrator};
use crate::plan::TestPlan;
use crate::progress::{Progress, ProgressCell, RunState};
use crate::result::{FailureKind, TestResult};
use crate::stats::Stats;

/// Default interval between progress callbacks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// TestSlot
// ---------------------------------------------------------------------------

/// Single-instance guard: at most one run per slot.
///
/// Cloning yields another handle to the same slot.
#[derive(Clone, Debug, Default)]
pub struct TestSlot {
    busy: Arc<AtomicBool>,
}

impl TestSlot {
    /// A free slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run currently holds the slot.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<SlotGuard, CoreError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CoreError::Busy)?;
        Ok(SlotGuard {
            busy: Arc::clone(&self.busy),
        })
    }
}

#[derive(Debug)]
struct SlotGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Publishes `WorkerLost` if the worker unwinds before reaching `Done`.
struct WorkerLostGuard(Arc<ProgressCell>);

impl Drop for WorkerLostGuard {
    fn drop(&mut self) {
        if thread::panicking() && !matches!(self.0.state(), RunState::Done(_)) {
            self.0.set_state(RunState::Done(FailureKind::WorkerLost.into()));
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// A run in progress on a background worker.
pub struct ExecutionContext {
    cancel: CancelToken,
    progress: Arc<ProgressCell>,
    done: Receiver<TestResult>,
    worker: Option<JoinHandle<()>>,
    // Declared last: released only after `Drop` has joined the worker.
    _slot: SlotGuard,
}

impl ExecutionContext {
    /// Validate `plan`, take `slot`, and start the run on a new thread.
    ///
    /// # Errors
    /// - [`CoreError::InvalidPlan`] if the plan does not validate.
    /// - [`CoreError::Busy`] if another run holds the slot.
    /// - [`CoreError::Spawn`] if the worker thread cannot be created.
    pub fn start(slot: &TestSlot, plan: TestPlan, backends: Backends) -> Result<Self, CoreError> {
        let cancel = CancelToken::new();
        let orchestrator = Orchestrator::new(plan, backends, cancel.clone())?;
        let guard = slot.acquire()?;
        let progress = orchestrator.progress();
        let (tx, done) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("sdprobe-worker".to_owned())
            .spawn(move || {
                let _lost = WorkerLostGuard(orchestrator.progress());
                let result = orchestrator.run();
                // The receiver may already be gone if the caller stopped
                // waiting; the result is still in the progress cell.
                let _ = tx.send(result);
            })
            .map_err(CoreError::Spawn)?;

        tracing::debug!("test worker started");
        Ok(Self {
            cancel,
            progress,
            done,
            worker: Some(worker),
            _slot: guard,
        })
    }

    /// Current result: `Running` until the worker finishes.
    #[must_use]
    pub fn result(&self) -> TestResult {
        self.progress.state().result()
    }

    /// Current measurements.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.progress.snapshot().stats
    }

    /// Current state and measurements, read together.
    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress.snapshot()
    }

    /// Whether the run has reached a terminal result.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.progress.state(), RunState::Done(_))
    }

    /// Ask the worker to stop at its next checkpoint.
    pub fn cancel(&self) {
        tracing::info!("cancellation requested");
        self.cancel.cancel();
    }

    /// A token that cancels this run; hand it to signal handlers.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block until the run finishes.
    pub fn wait(mut self) -> TestResult {
        let result = self.done.recv().unwrap_or(FailureKind::WorkerLost.into());
        self.join();
        result
    }

    /// Block until the run finishes, calling `on_progress` with a snapshot
    /// every `interval` while it is still running, and once more with the
    /// final snapshot.
    pub fn wait_with_progress<F>(mut self, interval: Duration, mut on_progress: F) -> TestResult
    where
        F: FnMut(&Progress),
    {
        let result = loop {
            match self.done.recv_timeout(interval) {
                Ok(result) => break result,
                Err(RecvTimeoutError::Timeout) => on_progress(&self.progress.snapshot()),
                Err(RecvTimeoutError::Disconnected) => break FailureKind::WorkerLost.into(),
            }
        };
        self.join();
        on_progress(&self.progress.snapshot());
        result
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("test worker panicked");
        }
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if !self.is_finished() {
                self.cancel.cancel();
            }
            self.join();
        }
    }
}
