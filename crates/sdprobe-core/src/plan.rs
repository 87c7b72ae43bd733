//! What a single run does: artifact name, chunk size, byte target, seed and
//! cleanup policy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pattern::{LfsrState, WORD_BYTES};

/// Chunk size of a standard run: 16 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Byte target per direction of a standard run: 16 MiB (1024 chunks).
pub const DEFAULT_TOTAL_BYTES: u64 = 16 * 1024 * 1024;

/// Seed of a standard run.
pub const DEFAULT_SEED: u32 = 1;

/// Artifact name of a standard run.
pub const DEFAULT_FILE_NAME: &str = "_PPTEST_.DAT";

/// When the test artifact is deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cleanup {
    /// Delete after a successful run; keep it for inspection after a failure.
    #[default]
    OnSuccess,
    /// Delete after any run that created it.
    Always,
    /// Never delete.
    Never,
}

impl fmt::Display for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnSuccess => write!(f, "on-success"),
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// Parameters of one write/read round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestPlan {
    /// Name of the artifact on the storage.
    pub file_name: String,
    /// Bytes per transfer call.
    pub chunk_size: usize,
    /// Bytes to write, then read, per direction.
    pub total_bytes: u64,
    /// Generator seed. Must be non-zero.
    pub seed: u32,
    /// Artifact deletion policy.
    pub cleanup: Cleanup,
}

impl Default for TestPlan {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_owned(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            total_bytes: DEFAULT_TOTAL_BYTES,
            seed: DEFAULT_SEED,
            cleanup: Cleanup::default(),
        }
    }
}

impl TestPlan {
    /// Check that the plan can run.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidPlan`] naming the first problem found.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason: String| Err(CoreError::InvalidPlan { reason });
        if self.file_name.is_empty() {
            return invalid("file name is empty".to_owned());
        }
        if self.chunk_size == 0 {
            return invalid("chunk size is zero".to_owned());
        }
        if self.chunk_size % WORD_BYTES != 0 {
            return invalid(format!(
                "chunk size {} is not a multiple of {WORD_BYTES} bytes",
                self.chunk_size
            ));
        }
        if self.total_bytes == 0 {
            return invalid("total bytes is zero".to_owned());
        }
        if self.total_bytes % self.chunk_size as u64 != 0 {
            return invalid(format!(
                "total bytes {} is not a whole number of {}-byte chunks",
                self.total_bytes, self.chunk_size
            ));
        }
        if self.seed == 0 {
            return invalid("seed must be non-zero".to_owned());
        }
        Ok(())
    }

    /// Number of chunk transfers per direction.
    #[must_use]
    pub const fn chunk_count(&self) -> u64 {
        self.total_bytes / self.chunk_size as u64
    }

    /// Generator state for the seed, or `None` if the seed is zero.
    #[must_use]
    pub const fn lfsr_seed(&self) -> Option<LfsrState> {
        LfsrState::from_seed(self.seed)
    }
}
