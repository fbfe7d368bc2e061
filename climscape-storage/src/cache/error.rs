//! Failure recorded for a key.

use std::sync::Arc;

use thiserror::Error;

/// A failed fetch, shared by every caller attached to it.
///
/// The fetcher's error is kept behind an `Arc` so one failure can be
/// replayed to many waiters without requiring `E: Clone`.
#[derive(Debug, Error)]
pub enum FetchError<E> {
    #[error("fetch failed: {0}")]
    Source(Arc<E>),

    #[error("fetch interrupted: {reason}")]
    Interrupted { reason: String },
}

impl<E> FetchError<E> {
    pub fn from_source(error: E) -> Self {
        Self::Source(Arc::new(error))
    }

    /// The fetcher's error, if the fetch got far enough to produce one.
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::Source(e) => Some(e.as_ref()),
            Self::Interrupted { .. } => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

impl<E> Clone for FetchError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Source(e) => Self::Source(Arc::clone(e)),
            Self::Interrupted { reason } => Self::Interrupted {
                reason: reason.clone(),
            },
        }
    }
}
