//! Test engine for sdprobe.
//!
//! Writes a deterministic pseudorandom pattern to a single artifact on the
//! storage under test, reads it back, verifies it byte for byte, and measures
//! every chunk transfer along the way.
//!
//! # Crate layout
//!
//! - [`pattern`]: LFSR pattern oracle (generate / verify).
//! - [`phase`]: one direction of transfer, chunk by chunk.
//! - [`orchestrator`]: write phase, read phase, terminal result.
//! - [`context`]: background worker, snapshots, cancellation, single-run slot.
//! - [`stats`], [`result`], [`progress`]: what a run reports.
//! - [`clock`], [`buffer`], [`cancel`]: seams for time, memory and stopping.
//!
//! A typical caller:
//!
//! ```no_run
//! use sdprobe_core::{Backends, ExecutionContext, TestPlan, TestSlot};
//! use sdprobe_storage::FsStorage;
//!
//! let slot = TestSlot::new();
//! let backends = Backends::new(Box::new(FsStorage::new("/media/sdcard")));
//! let ctx = ExecutionContext::start(&slot, TestPlan::default(), backends)?;
//! let result = ctx.wait();
//! println!("{result}");
//! # Ok::<(), sdprobe_core::CoreError>(())
//! ```

pub mod buffer;
pub mod cancel;
pub mod clock;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod pattern;
pub mod phase;
pub mod plan;
pub mod progress;
pub mod result;
pub mod stats;

pub use buffer::{ChunkAllocator, HeapAllocator, LimitedAllocator};
pub use cancel::CancelToken;
pub use clock::{Clock, MonotonicClock, StepClock};
pub use context::{DEFAULT_POLL_INTERVAL, ExecutionContext, TestSlot};
pub use error::CoreError;
pub use orchestrator::{Backends, Orchestrator};
pub use pattern::LfsrState;
pub use plan::{Cleanup, TestPlan};
pub use progress::{Progress, ProgressCell, RunState};
pub use result::{Direction, FailureKind, TestResult};
pub use stats::{DirectionStats, MismatchInfo, Stats};
