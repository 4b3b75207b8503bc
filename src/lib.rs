//! Tidelog - Embedded Single-Writer Time-Series Segment Store
//!
//! A Rust-based time-series store meant to be embedded inside a host
//! process, one store per data stream:
//!
//! - Rows keyed by a strictly monotonic integer timestamp are appended
//!   to an in-memory buffer mirrored to disk for crash recovery
//! - Full buffers are sealed into immutable lz4-compressed segment files
//!   whose filenames encode their key range
//! - Range and multi-key point queries merge the buffer and every sealed
//!   segment in ascending timestamp order
//!
//! # Architecture
//!
//! - **Active Buffer**: in-memory unsealed rows + the on-disk `current` file
//! - **Segment Catalog**: directory-scan discovery of sealed segments
//! - **Rotation/Retention**: seals buffers, prunes the oldest segments
//! - **Query Engine**: ordered merge across buffer and segments
//! - **Store**: top-level controller composing the above
//! - **Actor**: single-owner worker thread serializing access to one store

pub mod actor;
pub mod buffer;
pub mod catalog;
pub mod codec;
pub mod query;
pub mod rotation;
pub mod store;

mod error;
mod types;

pub use actor::StoreHandle;
pub use error::{Result, TideError};
pub use store::{Store, StoreConfig};
pub use types::*;

/// Tidelog version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod config {
    /// Estimated buffer size that triggers rotation into a segment (5MB)
    pub const CHUNK_SIZE: usize = 5_000_000;

    /// Sealed segments retained before the oldest are deleted
    pub const MAX_SEGMENTS: usize = 100;

    /// Fixed per-row overhead added to the buffer size estimate
    pub const ROW_OVERHEAD: usize = 16;
}
