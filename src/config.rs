//! sdprobe configuration (`sdprobe.toml`).
//!
//! Defines the typed configuration for a test run and the storage it runs
//! against. Every field is optional; a missing file means all defaults, which
//! describe the standard 16 MiB / 16 KiB run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sdprobe_core::plan::{DEFAULT_CHUNK_SIZE, DEFAULT_FILE_NAME, DEFAULT_SEED, DEFAULT_TOTAL_BYTES};
use sdprobe_core::{Cleanup, DEFAULT_POLL_INTERVAL, TestPlan};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sdprobe.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level sdprobe configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// What a run does.
    #[serde(default)]
    pub test: TestConfig,

    /// Where a run does it.
    #[serde(default)]
    pub storage: StorageConfig,
}

// ---------------------------------------------------------------------------
// TestConfig
// ---------------------------------------------------------------------------

/// Test run parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Artifact file name (default: `"_PPTEST_.DAT"`).
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Bytes per transfer (default: 16384).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Bytes per direction (default: 16777216).
    #[serde(default = "default_total_bytes")]
    pub total_bytes: u64,

    /// Pattern seed (default: 1). Must be non-zero.
    #[serde(default = "default_seed")]
    pub seed: u32,

    /// How often progress is reported while waiting, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// When the artifact is deleted.
    #[serde(default)]
    pub cleanup: Cleanup,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            chunk_size: default_chunk_size(),
            total_bytes: default_total_bytes(),
            seed: default_seed(),
            poll_interval_ms: default_poll_interval_ms(),
            cleanup: Cleanup::default(),
        }
    }
}

impl TestConfig {
    /// The [`TestPlan`] these settings describe. Not validated here.
    #[must_use]
    pub fn plan(&self) -> TestPlan {
        TestPlan {
            file_name: self.file_name.clone(),
            chunk_size: self.chunk_size,
            total_bytes: self.total_bytes,
            seed: self.seed,
            cleanup: self.cleanup,
        }
    }

    /// Progress interval as a [`Duration`]; zero falls back to the default.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        if self.poll_interval_ms == 0 {
            DEFAULT_POLL_INTERVAL
        } else {
            Duration::from_millis(self.poll_interval_ms)
        }
    }
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_owned()
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

const fn default_total_bytes() -> u64 {
    DEFAULT_TOTAL_BYTES
}

const fn default_seed() -> u32 {
    DEFAULT_SEED
}

#[allow(clippy::cast_possible_truncation)]
const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Storage selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Which backend holds the artifact.
    #[serde(default)]
    pub backend: BackendKind,

    /// Directory for the `fs` backend, normally the card's mount point
    /// (default: the working directory).
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: default_path(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from(".")
}

/// The storage backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Files under a mounted directory.
    #[default]
    Fs,
    /// RAM only; exercises the engine without touching a card.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fs => write!(f, "fs"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading an sdprobe configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl ProbeConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields all defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }

    /// Render as TOML.
    ///
    /// # Errors
    /// Returns `ConfigError` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError {
            path: None,
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
