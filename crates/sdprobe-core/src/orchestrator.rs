//! Test orchestrator: write phase, then read phase, reduced to one
//! [`TestResult`].
//!
//! ```text
//! Idle -> Writing -> ReadPending -> Reading -> Done(result)
//!            \______________\___________\_____/
//!                      (early exit on any failure)
//! ```
//!
//! Any failure is terminal; no transfer is ever retried, since a retry would
//! hide exactly the flaky behaviour this tool exists to expose. A cancel that
//! has been observed is reported as `Aborted` ahead of a short phase, so a
//! user stop never reads as a hardware fault.

use std::sync::Arc;

use sdprobe_storage::BlockStorage;

use crate::buffer::{ChunkAllocator, HeapAllocator};
use crate::cancel::CancelToken;
use crate::clock::{Clock, MonotonicClock};
use crate::error::CoreError;
use crate::pattern::LfsrState;
use crate::phase::{PhaseExecutor, PhaseFault};
use crate::plan::{Cleanup, TestPlan};
use crate::progress::{ProgressCell, RunState};
use crate::result::{Direction, FailureKind, TestResult};

/// External collaborators a run needs.
pub struct Backends {
    /// Where the artifact lives.
    pub storage: Box<dyn BlockStorage>,
    /// Tick source for all measurements.
    pub clock: Arc<dyn Clock>,
    /// Chunk buffer allocator.
    pub allocator: Arc<dyn ChunkAllocator>,
}

impl Backends {
    /// `storage` with the monotonic clock and the heap allocator.
    #[must_use]
    pub fn new(storage: Box<dyn BlockStorage>) -> Self {
        Self {
            storage,
            clock: Arc::new(MonotonicClock::new()),
            allocator: Arc::new(HeapAllocator),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the allocator.
    #[must_use]
    pub fn with_allocator(mut self, allocator: Arc<dyn ChunkAllocator>) -> Self {
        self.allocator = allocator;
        self
    }
}

/// Drives a single run. Consumed by [`run`](Self::run); a new orchestrator is
/// needed for every run.
pub struct Orchestrator {
    plan: TestPlan,
    seed: LfsrState,
    backends: Backends,
    cancel: CancelToken,
    progress: Arc<ProgressCell>,
    artifact_created: bool,
}

impl Orchestrator {
    /// Prepare a run of `plan`.
    ///
    /// # Errors
    /// [`CoreError::InvalidPlan`] if the plan does not validate.
    pub fn new(plan: TestPlan, backends: Backends, cancel: CancelToken) -> Result<Self, CoreError> {
        plan.validate()?;
        let seed = plan.lfsr_seed().ok_or_else(|| CoreError::InvalidPlan {
            reason: "seed must be non-zero".to_owned(),
        })?;
        let progress = Arc::new(ProgressCell::new(
            plan.total_bytes,
            backends.clock.frequency(),
        ));
        Ok(Self {
            plan,
            seed,
            backends,
            cancel,
            progress,
            artifact_created: false,
        })
    }

    /// Shared snapshot cell this run publishes into.
    #[must_use]
    pub fn progress(&self) -> Arc<ProgressCell> {
        Arc::clone(&self.progress)
    }

    /// Execute the run to its terminal result.
    pub fn run(mut self) -> TestResult {
        let _span = tracing::info_span!(
            "sd_test",
            storage = %self.backends.storage.describe(),
            file = %self.plan.file_name,
            chunk_size = self.plan.chunk_size,
            total_bytes = self.plan.total_bytes,
            seed = self.plan.seed,
        )
        .entered();

        let result = self.execute();
        self.cleanup(result);
        self.progress.set_state(RunState::Done(result));
        match result {
            TestResult::Success => tracing::info!("test passed"),
            other => tracing::warn!(code = other.code(), "test {other}"),
        }
        result
    }

    fn execute(&mut self) -> TestResult {
        let target = self.plan.total_bytes;
        let seed = self.seed;

        self.progress.set_state(RunState::Writing);
        let written = match self.executor().write(seed) {
            Ok(stats) => stats,
            Err(fault) => return fault_result(fault, Direction::Write),
        };
        self.artifact_created = true;
        if self.cancel.is_cancelled() {
            return FailureKind::Aborted.into();
        }
        if written.bytes < target {
            return FailureKind::TransferIncomplete(Direction::Write).into();
        }

        self.progress.set_state(RunState::ReadPending);
        if self.cancel.is_cancelled() {
            return FailureKind::Aborted.into();
        }

        // The verifier starts from the plan's seed, not from wherever the
        // writer's state ended up.
        self.progress.set_state(RunState::Reading);
        let read = match self.executor().read(seed) {
            Ok(outcome) => outcome,
            Err(fault) => return fault_result(fault, Direction::Read),
        };
        if read.mismatch.is_some() {
            return FailureKind::VerifyMismatch.into();
        }
        if self.cancel.is_cancelled() {
            return FailureKind::Aborted.into();
        }
        if read.stats.bytes < target {
            return FailureKind::TransferIncomplete(Direction::Read).into();
        }
        TestResult::Success
    }

    fn executor(&mut self) -> PhaseExecutor<'_> {
        PhaseExecutor::new(
            self.backends.storage.as_mut(),
            self.backends.clock.as_ref(),
            self.backends.allocator.as_ref(),
            &self.cancel,
            &self.progress,
            &self.plan.file_name,
            self.plan.chunk_size,
            self.plan.total_bytes,
        )
    }

    fn cleanup(&mut self, result: TestResult) {
        let remove = self.artifact_created
            && match self.plan.cleanup {
                Cleanup::OnSuccess => result.is_success(),
                Cleanup::Always => true,
                Cleanup::Never => false,
            };
        if !remove {
            return;
        }
        // Best effort: a leftover artifact does not change the verdict.
        if let Err(error) = self.backends.storage.remove(&self.plan.file_name) {
            tracing::warn!(%error, "could not remove test artifact");
        }
    }
}

fn fault_result(fault: PhaseFault, direction: Direction) -> TestResult {
    match fault {
        PhaseFault::HeapExhausted => FailureKind::HeapExhausted.into(),
        PhaseFault::OpenFailed(_) => FailureKind::OpenFailed(direction).into(),
    }
}
