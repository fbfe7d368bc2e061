//! Error types for Climscape operations

use thiserror::Error;

/// Composite key encoding errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Token {token:?} at position {position} contains the reserved separator {separator:?}")]
    SeparatorInToken {
        position: usize,
        token: String,
        separator: char,
    },

    #[error("Token at position {position} equals the reserved absent sentinel {sentinel:?}")]
    SentinelToken { position: usize, sentinel: String },

    #[error("Token at position {position} is empty")]
    EmptyToken { position: usize },
}

/// Dimension mismatch between two grids or series.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Row count mismatch: left has {left} rows, right has {right}")]
    RowCount { left: usize, right: usize },

    #[error("Row {row} length mismatch: left has {left} cells, right has {right}")]
    RowLength {
        row: usize,
        left: usize,
        right: usize,
    },

    #[error("Series length mismatch: left has {left} points, right has {right}")]
    SeriesLength { left: usize, right: usize },
}

/// Errors raised by a simulation data source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    #[error("I/O error reading {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Malformed key {key}: expected {expected} tokens, got {got}")]
    MalformedKey {
        key: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid resource path: {path}")]
    InvalidPath { path: String },
}

impl SourceError {
    /// Build a decode error from a serde_json failure.
    pub fn decode(path: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::Decode {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

// =============================================================================
// TESTS
// =============================================================================
