//! Core types for tidelog

use serde::{Deserialize, Serialize};

/// Timestamp in nanoseconds since Unix epoch
pub type Timestamp = u64;

/// A single row: timestamp plus opaque payload bytes
///
/// The engine never inspects payload contents; encoding and decoding of
/// whatever the host stores in it happens outside the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Row key, strictly monotonic per store
    pub timestamp: Timestamp,
    /// Opaque payload
    pub payload: Vec<u8>,
}

impl Row {
    /// Create a new row
    pub fn new(timestamp: Timestamp, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// Get the encoded size in bytes (approximate)
    pub fn size(&self) -> usize {
        8 + self.payload.len()
    }
}

/// Per-artifact metadata returned by [`crate::Store::count_files`]
///
/// The active buffer is reported as one artifact alongside every sealed
/// segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// File name of the artifact (`current` for the active buffer)
    pub identifier: String,
    /// Number of rows it holds
    pub row_count: usize,
    /// Smallest timestamp it holds
    pub first_timestamp: Timestamp,
    /// Largest timestamp it holds
    pub last_timestamp: Timestamp,
}
