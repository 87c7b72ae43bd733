//! Terminal outcome of a run.

use std::fmt;

use serde::Serialize;

/// Transfer direction of a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Writing the pattern to the artifact.
    Write,
    /// Reading the artifact back and verifying it.
    Read,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Read => write!(f, "read"),
        }
    }
}

/// Why a run did not succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "direction", rename_all = "kebab-case")]
pub enum FailureKind {
    /// Cancellation was requested and observed.
    Aborted,
    /// The chunk buffer could not be allocated.
    HeapExhausted,
    /// The artifact could not be opened.
    OpenFailed(Direction),
    /// The phase stopped before reaching its byte target.
    TransferIncomplete(Direction),
    /// Data read back differs from what was written.
    VerifyMismatch,
    /// The worker went away without reporting (it panicked).
    WorkerLost,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => write!(f, "aborted"),
            Self::HeapExhausted => write!(f, "out of memory for chunk buffer"),
            Self::OpenFailed(d) => write!(f, "could not open artifact for {d}"),
            Self::TransferIncomplete(d) => write!(f, "{d} phase ended short of its target"),
            Self::VerifyMismatch => write!(f, "read-back data does not match"),
            Self::WorkerLost => write!(f, "test worker stopped unexpectedly"),
        }
    }
}

/// Outcome of a run. `Running` is the only non-terminal value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "status", content = "failure", rename_all = "kebab-case")]
pub enum TestResult {
    /// The run has not finished.
    #[default]
    Running,
    /// Every byte was written, read back and verified.
    Success,
    /// The run ended without success.
    Failure(FailureKind),
}

impl TestResult {
    /// Whether this is a final outcome.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Whether the run succeeded.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Compact numeric code used by the short failure rendering.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 1,
            Self::Running => 0,
            Self::Failure(kind) => match kind {
                FailureKind::WorkerLost => -1,
                FailureKind::HeapExhausted => -2,
                FailureKind::OpenFailed(Direction::Write) => -3,
                FailureKind::OpenFailed(Direction::Read) => -4,
                FailureKind::Aborted => -5,
                FailureKind::TransferIncomplete(Direction::Write) => -6,
                FailureKind::TransferIncomplete(Direction::Read) => -7,
                FailureKind::VerifyMismatch => -8,
            },
        }
    }
}

impl From<FailureKind> for TestResult {
    fn from(kind: FailureKind) -> Self {
        Self::Failure(kind)
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failure(kind) => write!(f, "failed: {kind}"),
        }
    }
}
