//! Rendering a finished run for people and for scripts.
//!
//! Times are shown in milliseconds and rates in MB/s (10^6 bytes), each as a
//! right-aligned `III.FFF` field. Values that do not fit three integer digits
//! render as [`OVERFLOW`].

use std::fmt::Write as _;

use serde::Serialize;

use sdprobe_core::{Direction, DirectionStats, MismatchInfo, Stats, TestResult};

/// Placeholder for a value too large for its field.
pub const OVERFLOW: &str = "HHH.HHH";

/// Format a tick count as milliseconds.
#[must_use]
pub fn format_ticks_as_ms(ticks: u64, frequency: u64) -> String {
    if frequency == 0 {
        return OVERFLOW.to_owned();
    }
    let us = saturate_u32(u128::from(ticks) * 1_000_000 / u128::from(frequency));
    fixed_point(us / 1000, us % 1000)
}

/// Format `bytes` moved in `ticks` as MB/s.
#[must_use]
pub fn format_bytes_per_ticks_as_mb(bytes: u64, ticks: u64, frequency: u64) -> String {
    if ticks == 0 {
        return OVERFLOW.to_owned();
    }
    let bps = saturate_u32(u128::from(bytes) * u128::from(frequency) / u128::from(ticks));
    let kbps = bps / 1000;
    fixed_point(kbps / 1000, kbps % 1000)
}

fn fixed_point(int: u32, frac: u32) -> String {
    if int < 1000 {
        format!("{int:>3}.{frac:03}")
    } else {
        OVERFLOW.to_owned()
    }
}

fn saturate_u32(value: u128) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Phase summary
// ---------------------------------------------------------------------------

/// Formatted figures for one direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    /// Shortest chunk transfer, ms.
    pub min_ms: String,
    /// Phase wall time over chunk count, ms.
    pub avg_ms: String,
    /// Longest chunk transfer, ms.
    pub max_ms: String,
    /// Bytes over (shortest transfer × chunk count), MB/s.
    pub best_mb_s: String,
    /// Bytes over phase wall time, MB/s.
    pub overall_mb_s: String,
}

impl PhaseSummary {
    /// Summarize a direction; `None` if it moved no chunks.
    #[must_use]
    pub fn new(stats: &DirectionStats, frequency: u64) -> Option<Self> {
        let avg = stats.mean_phase_ticks()?;
        let min = stats.min_ticks();
        Some(Self {
            min_ms: format_ticks_as_ms(min, frequency),
            avg_ms: format_ticks_as_ms(avg, frequency),
            max_ms: format_ticks_as_ms(stats.duration_max, frequency),
            best_mb_s: format_bytes_per_ticks_as_mb(
                stats.bytes,
                min.saturating_mul(stats.count),
                frequency,
            ),
            overall_mb_s: format_bytes_per_ticks_as_mb(stats.bytes, stats.phase_ticks, frequency),
        })
    }

    /// `min/avg/max`.
    #[must_use]
    pub fn time_line(&self) -> String {
        format!("{}/{}/{}", self.min_ms, self.avg_ms, self.max_ms)
    }

    /// `best overall`.
    #[must_use]
    pub fn rate_line(&self) -> String {
        format!("{} {}", self.best_mb_s, self.overall_mb_s)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Output format for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Short human-readable block.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// A finished run: its result plus everything measured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Terminal result of the run.
    pub result: TestResult,
    /// Legacy numeric code for `result`.
    pub code: i32,
    /// Seed the pattern was generated from.
    pub seed: u32,
    /// Write figures; `None` if no chunk was written.
    pub write: Option<PhaseSummary>,
    /// Read figures; `None` if no chunk was read.
    pub read: Option<PhaseSummary>,
    /// Raw tick counts behind the figures.
    pub stats: Stats,
}

impl Report {
    /// Build the report, formatting each direction that moved data.
    #[must_use]
    pub fn new(result: TestResult, seed: u32, stats: Stats) -> Self {
        let summary = |d: Direction| PhaseSummary::new(stats.direction(d), stats.tick_frequency);
        Self {
            result,
            code: result.code(),
            seed,
            write: summary(Direction::Write),
            read: summary(Direction::Read),
            stats,
        }
    }

    /// Render in the requested format.
    ///
    /// # Errors
    /// Returns an error if JSON serialization fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    /// Timing block on success, `Fail: <code>` and the reason otherwise.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.result.is_success() {
            for (label, summary) in [("Write", &self.write), ("Read", &self.read)] {
                if let Some(s) = summary {
                    let _ = writeln!(out, "{label:<6}time (ms)   {}", s.time_line());
                    let _ = writeln!(out, "{label:<6}rate (MB/s) {}", s.rate_line());
                }
            }
            return out;
        }

        let _ = writeln!(out, "Fail: {:>4}", self.code);
        let _ = writeln!(out, "{}", self.result);
        if let Some(m) = &self.stats.mismatch {
            let _ = writeln!(out, "{}", describe_mismatch(m));
        }
        out
    }
}

fn describe_mismatch(m: &MismatchInfo) -> String {
    format!(
        "first bad word: chunk {} word {} (byte {}), expected {:#010x} read {:#010x}",
        m.chunk, m.word, m.byte_offset, m.expected, m.actual
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sdprobe_core::FailureKind;

    const MHZ: u64 = 1_000_000;

    #[test]
    fn ticks_as_ms() {
        assert_eq!(format_ticks_as_ms(1_500, MHZ), "  1.500");
        assert_eq!(format_ticks_as_ms(0, MHZ), "  0.000");
        assert_eq!(format_ticks_as_ms(123_456, MHZ), "123.456");
        assert_eq!(format_ticks_as_ms(999_999, MHZ), "999.999");
        assert_eq!(format_ticks_as_ms(1_000_000, MHZ), OVERFLOW);
    }

    #[test]
    fn ticks_as_ms_scales_by_frequency() {
        // 2 kHz: one tick is half a millisecond.
        assert_eq!(format_ticks_as_ms(3, 2_000), "  1.500");
        assert_eq!(format_ticks_as_ms(7, 1_000_000_000), "  0.000");
        assert_eq!(format_ticks_as_ms(7, 0), OVERFLOW);
    }

    #[test]
    fn huge_tick_counts_saturate_to_overflow() {
        assert_eq!(format_ticks_as_ms(u64::MAX, MHZ), OVERFLOW);
        assert_eq!(format_ticks_as_ms(5_000_000_000, MHZ), OVERFLOW);
    }

    #[test]
    fn bytes_per_ticks() {
        // 16 MiB in one second.
        assert_eq!(format_bytes_per_ticks_as_mb(16_777_216, MHZ, MHZ), " 16.777");
        // 16 KiB in 2 ms.
        assert_eq!(format_bytes_per_ticks_as_mb(16_384, 2_000, MHZ), "  8.192");
        assert_eq!(format_bytes_per_ticks_as_mb(1, MHZ, MHZ), "  0.000");
    }

    #[test]
    fn bytes_per_zero_ticks_is_overflow() {
        assert_eq!(format_bytes_per_ticks_as_mb(16_384, 0, MHZ), OVERFLOW);
    }

    #[test]
    fn bytes_per_ticks_overflow() {
        // 4 GB/s does not fit in the rate field.
        assert_eq!(format_bytes_per_ticks_as_mb(4_000_000_000, MHZ, MHZ), OVERFLOW);
        assert_eq!(format_bytes_per_ticks_as_mb(u64::MAX, 1, MHZ), OVERFLOW);
    }

    fn direction(min: u64, max: u64, phase: u64, count: u64, chunk: u64) -> DirectionStats {
        DirectionStats {
            duration_min: Some(min),
            duration_max: max,
            transfer_ticks: phase,
            phase_ticks: phase,
            bytes: chunk * count,
            count,
        }
    }

    fn success_stats() -> Stats {
        Stats {
            write: direction(2_000, 9_000, 4_096_000, 1024, 16_384),
            read: direction(1_000, 1_500, 1_024_000, 1024, 16_384),
            tick_frequency: MHZ,
            mismatch: None,
        }
    }

    #[test]
    fn summary_uses_phase_time_for_average() {
        let stats = success_stats();
        let s = PhaseSummary::new(&stats.write, MHZ).unwrap();
        assert_eq!(s.time_line(), "  2.000/  4.000/  9.000");
        // 16 MiB over 1024 × 2 ms, then over 4.096 s.
        assert_eq!(s.rate_line(), "  8.192   4.096");
    }

    #[test]
    fn summary_absent_without_chunks() {
        assert_eq!(PhaseSummary::new(&DirectionStats::default(), MHZ), None);
    }

    #[test]
    fn success_text_has_both_directions() {
        let report = Report::new(TestResult::Success, 1, success_stats());
        let text = report.render_text();
        assert!(text.contains("Write time (ms)     2.000/  4.000/  9.000"), "{text}");
        assert!(text.contains("Read  rate (MB/s)  16.384  16.384"), "{text}");
        assert!(!text.contains("Fail"));
    }

    #[test]
    fn failure_text_shows_padded_code() {
        let report = Report::new(
            FailureKind::Aborted.into(),
            1,
            Stats::default(),
        );
        let text = report.render_text();
        assert!(text.starts_with("Fail:   -5\n"), "{text}");
        assert!(text.contains("aborted"));
    }

    #[test]
    fn mismatch_text_locates_bad_word() {
        let stats = Stats {
            mismatch: Some(MismatchInfo {
                chunk: 3,
                word: 17,
                byte_offset: 3 * 16_384 + 17 * 4,
                expected: 0xdead_beef,
                actual: 0xdead_beee,
            }),
            ..success_stats()
        };
        let text = Report::new(FailureKind::VerifyMismatch.into(), 1, stats).render_text();
        assert!(text.starts_with("Fail:   -8\n"), "{text}");
        assert!(text.contains("chunk 3 word 17"), "{text}");
        assert!(text.contains("0xdeadbeef"), "{text}");
    }

    #[test]
    fn json_carries_result_code_and_stats() {
        let report = Report::new(TestResult::Success, 42, success_stats());
        let json = report.render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["result"]["status"], "success");
        assert_eq!(value["code"], 1);
        assert_eq!(value["seed"], 42);
        assert_eq!(value["stats"]["write"]["count"], 1024);
        assert_eq!(value["write"]["avg_ms"], "  4.000");
    }

    #[test]
    fn json_failure_names_kind_and_direction() {
        let result: TestResult = FailureKind::TransferIncomplete(Direction::Read).into();
        let json = Report::new(result, 1, Stats::default())
            .render(OutputFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["result"]["status"], "failure");
        assert_eq!(value["result"]["failure"]["kind"], "transfer-incomplete");
        assert_eq!(value["result"]["failure"]["direction"], "read");
        assert_eq!(value["code"], -7);
        assert!(value["write"].is_null());
    }

    proptest! {
        #[test]
        fn fields_are_always_seven_columns(
            ticks in any::<u64>(),
            bytes in any::<u64>(),
            frequency in 1u64..=1_000_000_000,
        ) {
            prop_assert_eq!(format_ticks_as_ms(ticks, frequency).len(), 7);
            prop_assert_eq!(format_bytes_per_ticks_as_mb(bytes, ticks, frequency).len(), 7);
        }
    }
}
