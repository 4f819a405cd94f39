//! Errors reported by content providers.

use std::time::Duration;

use thiserror::Error;

/// A failure reported by a [`ContentProvider`](super::ContentProvider).
///
/// Providers report what they know; the orchestrator classifies it into a
/// [`ServiceError`](crate::ServiceError).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no record with this id.
    #[error("record {id} does not exist")]
    NotFound { id: String },

    /// The provider asked us to slow down.
    #[error("too many requests")]
    RateLimited { retry_after: Option<Duration> },

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Could not reach the provider.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Content was fetched but could not be converted.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Local I/O failure while producing the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unstructured failure text from the underlying provider library.
    #[error("{message}")]
    Library { message: String },
}

impl ProviderError {
    /// Creates a library error from free-form text.
    pub fn library(message: impl Into<String>) -> Self {
        Self::Library {
            message: message.into(),
        }
    }
}
