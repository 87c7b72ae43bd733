//! Per-direction transfer measurements.
//!
//! All durations are raw [`Clock`](crate::Clock) ticks; `tick_frequency`
//! travels with the record so consumers can convert.

use serde::Serialize;

use crate::result::Direction;

/// Measurements for one direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DirectionStats {
    /// Shortest single chunk transfer, once one has been recorded.
    pub duration_min: Option<u64>,
    /// Longest single chunk transfer.
    pub duration_max: u64,
    /// Sum of all chunk transfer durations.
    pub transfer_ticks: u64,
    /// Wall time of the whole phase, pattern work and close included.
    pub phase_ticks: u64,
    /// Bytes transferred.
    pub bytes: u64,
    /// Completed chunk transfers.
    pub count: u64,
}

impl DirectionStats {
    /// Account for one completed chunk transfer of `bytes` taking `ticks`.
    ///
    /// A zero-tick transfer only becomes the minimum when no minimum has been
    /// recorded yet.
    pub fn record_chunk(&mut self, bytes: usize, ticks: u64) {
        self.bytes += bytes as u64;
        self.count += 1;
        self.transfer_ticks = self.transfer_ticks.saturating_add(ticks);
        self.duration_min = match self.duration_min {
            None => Some(ticks),
            Some(min) if ticks != 0 && ticks < min => Some(ticks),
            keep => keep,
        };
        if ticks > self.duration_max {
            self.duration_max = ticks;
        }
    }

    /// Mean chunk transfer duration, if any chunk completed.
    #[must_use]
    pub fn mean_transfer_ticks(&self) -> Option<u64> {
        self.transfer_ticks.checked_div(self.count)
    }

    /// Phase wall time divided by chunk count, if any chunk completed.
    #[must_use]
    pub fn mean_phase_ticks(&self) -> Option<u64> {
        self.phase_ticks.checked_div(self.count)
    }

    /// Minimum chunk duration, zero if none recorded.
    #[must_use]
    pub fn min_ticks(&self) -> u64 {
        self.duration_min.unwrap_or(0)
    }
}

/// Location of the first word that failed verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MismatchInfo {
    /// Zero-based chunk index within the read phase.
    pub chunk: u64,
    /// Zero-based word index within that chunk.
    pub word: usize,
    /// Absolute byte offset of the word in the artifact.
    pub byte_offset: u64,
    /// The word the generator expected.
    pub expected: u32,
    /// The word that was read.
    pub actual: u32,
}

/// Measurements for a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Write phase.
    pub write: DirectionStats,
    /// Read phase.
    pub read: DirectionStats,
    /// Clock ticks per second the durations were measured with.
    pub tick_frequency: u64,
    /// First verification failure, if any.
    pub mismatch: Option<MismatchInfo>,
}

impl Stats {
    /// Measurements for `direction`.
    #[must_use]
    pub const fn direction(&self, direction: Direction) -> &DirectionStats {
        match direction {
            Direction::Write => &self.write,
            Direction::Read => &self.read,
        }
    }

    /// Mutable measurements for `direction`.
    pub const fn direction_mut(&mut self, direction: Direction) -> &mut DirectionStats {
        match direction {
            Direction::Write => &mut self.write,
            Direction::Read => &mut self.read,
        }
    }
}
