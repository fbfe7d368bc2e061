//! Error types for the results services.

use climscape_core::{ConfigError, EncodingError, ShapeError, SourceError};
use climscape_storage::FetchError;
use thiserror::Error;

/// Umbrella error of the orchestration layer.
///
/// `Clone` so a failure stored in a cache can be handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResultsError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Fetch interrupted: {reason}")]
    Interrupted { reason: String },

    #[error("Scenario with slug {slug} not found")]
    UnknownScenario { slug: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Telemetry setup failed: {reason}")]
    Telemetry { reason: String },
}

/// Result type for results operations.
pub type ResultsResult<T> = Result<T, ResultsError>;

impl From<FetchError<ResultsError>> for ResultsError {
    fn from(err: FetchError<ResultsError>) -> Self {
        match err {
            FetchError::Source(inner) => (*inner).clone(),
            FetchError::Interrupted { reason } => ResultsError::Interrupted { reason },
        }
    }
}
