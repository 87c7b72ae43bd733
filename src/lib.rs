//! sdprobe library crate: config, logging and report rendering for the
//! `sdprobe` binary.
//!
//! The test engine itself lives in `sdprobe-core`; storage backends live in
//! `sdprobe-storage`. This crate exposes the binary's outer layers so that
//! integration tests can exercise them without going through the CLI.

pub mod config;
pub mod report;
pub mod telemetry;
