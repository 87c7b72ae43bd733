//! Setup errors for the test engine.
//!
//! A run itself never fails with an error: every way a run can end is a
//! [`TestResult`](crate::TestResult). [`CoreError`] covers only what can go
//! wrong *before* a run starts.

use thiserror::Error;

/// Errors raised while preparing or starting a run.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The [`TestPlan`](crate::TestPlan) is not runnable.
    #[error("invalid test plan: {reason}")]
    InvalidPlan {
        /// What is wrong with the plan.
        reason: String,
    },

    /// Another run already holds the [`TestSlot`](crate::TestSlot).
    #[error("a test is already running")]
    Busy,

    /// The background worker thread could not be started.
    #[error("failed to spawn test worker: {0}")]
    Spawn(#[source] std::io::Error),
}
