//! Error types for filterbench operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using filterbench's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading inputs, building filters, searching or scoring.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error while reading or writing a file.
    #[error("io error: {0}")]
    Io(String),

    /// A line of an attribute file could not be parsed.
    #[error("{}: line {line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Filter type token not in {EM, R, EMIS, EM_R}.
    #[error("unsupported filter type: {0}")]
    UnsupportedFilterType(String),

    /// Item and query attributes were decoded under different schemas.
    #[error("schema mismatch: items are {items}, queries are {queries}")]
    SchemaMismatch {
        items: &'static str,
        queries: &'static str,
    },

    /// Two inputs that must describe the same population have different sizes.
    #[error("count mismatch: {what} ({left} vs {right})")]
    CountMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// Vector dimension mismatch between index and input.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A mandatory input decoded to zero records.
    #[error("no records decoded from {}", .0.display())]
    EmptyInput(PathBuf),

    /// Every query has an empty ground truth, so recall is undefined.
    #[error("ground truth is empty for every query; recall is undefined")]
    EmptyGroundTruth,

    /// Persisted index failed validation.
    #[error("index corrupted: {0}")]
    IndexCorrupted(String),

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
