//! Error taxonomy shared by the orchestrator, the session store and the
//! artifact store.
//!
//! Every provider-originated failure is kept as the `source` of the
//! [`ServiceError`] it was classified into, so callers can walk the chain
//! down to the collaborator's own error.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors surfaced by the core to its callers.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The provider has no record with this id.
    #[error("record not found: {id}")]
    RecordNotFound {
        id: String,
        #[source]
        source: Option<ProviderError>,
    },

    /// The provider is throttling us.
    #[error("content provider is rate limiting requests")]
    ProviderRateLimited {
        #[source]
        source: Option<ProviderError>,
    },

    /// A failure that may go away on its own (timeouts, dropped connections).
    #[error("content provider failed transiently: {detail}")]
    ProviderTransient {
        detail: String,
        #[source]
        source: Option<ProviderError>,
    },

    /// The provider fetched the content but could not produce the artifact.
    #[error("conversion failed: {detail}")]
    ConversionFailed {
        detail: String,
        #[source]
        source: Option<ProviderError>,
    },

    /// The provider reported success but the artifact is not on disk.
    #[error("artifact missing after fetch: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// A reply could not be used to pick a record from the user's session.
    #[error("invalid selection {input:?}: {reason}")]
    InvalidSelection {
        input: String,
        reason: SelectionRejection,
    },

    /// The user has no live selection session.
    #[error("no active selection session for user {user_id}")]
    NoActiveSession { user_id: String },

    /// The record id does not have the shape the provider accepts.
    #[error("invalid record id: {id:?}")]
    InvalidRecordId { id: String },

    /// A session cannot be started from an empty result set.
    #[error("search for {keyword:?} returned no results")]
    EmptyResults { keyword: String },

    /// Anything the classifier did not recognise.
    #[error("unexpected failure: {detail}")]
    Unknown {
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Why a selection reply was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRejection {
    /// The text is not a positive integer.
    NotANumber,
    /// The number is outside `1..=len`.
    OutOfRange { len: usize },
    /// There is no session to select from.
    NoSession,
    /// The session outlived its time-to-live.
    Expired,
}

impl fmt::Display for SelectionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRejection::NotANumber => write!(f, "not a positive number"),
            SelectionRejection::OutOfRange { len } => {
                write!(f, "expected a number between 1 and {}", len)
            }
            SelectionRejection::NoSession => write!(f, "no search results to choose from"),
            SelectionRejection::Expired => write!(f, "search results have expired"),
        }
    }
}

/// Fieldless discriminant of [`ServiceError`], for rendering and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RecordNotFound,
    ProviderRateLimited,
    ProviderTransient,
    ConversionFailed,
    ArtifactMissing,
    InvalidSelection,
    NoActiveSession,
    InvalidRecordId,
    EmptyResults,
    Unknown,
}

impl ErrorKind {
    /// Stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RecordNotFound => "record_not_found",
            ErrorKind::ProviderRateLimited => "provider_rate_limited",
            ErrorKind::ProviderTransient => "provider_transient",
            ErrorKind::ConversionFailed => "conversion_failed",
            ErrorKind::ArtifactMissing => "artifact_missing",
            ErrorKind::InvalidSelection => "invalid_selection",
            ErrorKind::NoActiveSession => "no_active_session",
            ErrorKind::InvalidRecordId => "invalid_record_id",
            ErrorKind::EmptyResults => "empty_results",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServiceError {
    /// Creates a record-not-found error without a provider cause.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            id: id.into(),
            source: None,
        }
    }

    /// Creates an invalid selection error.
    pub fn invalid_selection(input: impl Into<String>, reason: SelectionRejection) -> Self {
        Self::InvalidSelection {
            input: input.into(),
            reason,
        }
    }

    /// Creates an unknown error without a cause.
    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::Unknown {
            detail: detail.into(),
            source: None,
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            Self::ProviderRateLimited { .. } => ErrorKind::ProviderRateLimited,
            Self::ProviderTransient { .. } => ErrorKind::ProviderTransient,
            Self::ConversionFailed { .. } => ErrorKind::ConversionFailed,
            Self::ArtifactMissing { .. } => ErrorKind::ArtifactMissing,
            Self::InvalidSelection { .. } => ErrorKind::InvalidSelection,
            Self::NoActiveSession { .. } => ErrorKind::NoActiveSession,
            Self::InvalidRecordId { .. } => ErrorKind::InvalidRecordId,
            Self::EmptyResults { .. } => ErrorKind::EmptyResults,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderRateLimited { .. } | Self::ProviderTransient { .. }
        )
    }

    /// The provider error this was classified from, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::RecordNotFound { source, .. }
            | Self::ProviderRateLimited { source }
            | Self::ProviderTransient { source, .. }
            | Self::ConversionFailed { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = ServiceError::not_found("100001");
        assert_eq!(err.to_string(), "record not found: 100001");

        let err = ServiceError::invalid_selection("5", SelectionRejection::OutOfRange { len: 3 });
        assert_eq!(
            err.to_string(),
            "invalid selection \"5\": expected a number between 1 and 3"
        );

        let err = ServiceError::ArtifactMissing {
            path: PathBuf::from("/tmp/100001.pdf"),
        };
        assert_eq!(err.to_string(), "artifact missing after fetch: /tmp/100001.pdf");
    }

    #[test]
    fn test_kind_and_retryable() {
        let err = ServiceError::ProviderRateLimited { source: None };
        assert_eq!(err.kind(), ErrorKind::ProviderRateLimited);
        assert!(err.is_retryable());

        let err = ServiceError::not_found("1");
        assert_eq!(err.kind().as_str(), "record_not_found");
        assert!(!err.is_retryable());

        let err = ServiceError::NoActiveSession {
            user_id: "u".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NoActiveSession);
    }

    #[test]
    fn test_source_chain_is_kept() {
        let err = ServiceError::RecordNotFound {
            id: "42".to_string(),
            source: Some(ProviderError::NotFound {
                id: "42".to_string(),
            }),
        };

        let source = err.source().expect("source should be kept");
        assert!(source.to_string().contains("42"));
        assert!(matches!(
            err.provider_error(),
            Some(ProviderError::NotFound { .. })
        ));
    }
}
