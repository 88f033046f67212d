//! Error handling for the risk screening pipeline.

use std::path::PathBuf;

/// Specialized error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum RiskScreenError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error decoding the delimited source
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from the backing store
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The source file is missing, unreadable, or its header does not carry
    /// the mapped columns. Fatal: aborts the load before any append.
    #[error("Source format error in {}: {message}", path.display())]
    SourceFormat {
        /// Path of the offending source file
        path: PathBuf,
        /// What made the source unusable
        message: String,
    },

    /// A derived row already exists for the referenced raw record
    #[error("Duplicate derived result for raw id {raw_id}")]
    DuplicateResult {
        /// The raw record reference that collided
        raw_id: i64,
    },

    /// A page write kept failing after wholesale retries
    #[error("Failed to persist page {page} after {attempts} attempts: {source}")]
    Persistence {
        /// Zero-based page index that could not be written
        page: u64,
        /// Number of attempts made
        attempts: u32,
        /// The last store error observed
        #[source]
        source: Box<RiskScreenError>,
    },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, RiskScreenError>;
