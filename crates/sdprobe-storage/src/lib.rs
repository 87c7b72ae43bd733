//! Storage access layer for sdprobe.
//!
//! This crate defines the [`BlockStorage`] and [`TestFile`] traits, the only
//! interface through which the test engine touches the card under test. The
//! engine never sees `std::fs` (or any driver) directly; it opens, writes,
//! reads, closes and removes a single artifact through these traits.
//!
//! # Crate layout
//!
//! - [`storage`]: the trait definitions.
//! - [`error`]: the [`StorageError`] enum returned by all trait methods.
//! - [`FsStorage`]: files under a directory on a mounted card.
//! - [`MemStorage`]: RAM-backed store with deterministic fault injection.

pub mod error;
pub mod storage;

mod fs_impl;
mod mem_impl;

pub use error::StorageError;
pub use fs_impl::FsStorage;
pub use mem_impl::{FaultPlan, MemStorage};
pub use storage::{BlockStorage, TestFile};
