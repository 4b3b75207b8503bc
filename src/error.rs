//! Error types for tidelog

use thiserror::Error;

/// Result type alias for tidelog operations
pub type Result<T> = std::result::Result<T, TideError>;

/// Tidelog error types
#[derive(Error, Debug)]
pub enum TideError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Append timestamp is behind the store watermark
    #[error("monotonicity violation: timestamp {attempted} is behind watermark {watermark}")]
    Monotonicity { attempted: u64, watermark: u64 },

    /// Segment or current file failed to decompress or decode
    #[error("corrupt segment: {0}")]
    CorruptSegment(String),

    /// Invalid store-open configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The store worker thread is gone
    #[error("store worker disconnected")]
    Disconnected,
}

impl TideError {
    /// Check if error indicates on-disk corruption
    pub fn is_corruption(&self) -> bool {
        matches!(self, TideError::CorruptSegment(_))
    }

    /// Check if error is a per-call, recoverable rejection
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TideError::Monotonicity { .. })
    }
}
