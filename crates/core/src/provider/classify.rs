//! Classification of provider failures into [`ServiceError`] kinds.
//!
//! Structured [`ProviderError`] variants map directly. Free-form library
//! failures are matched against the failure phrases the provider library is
//! known to emit (in English and Chinese); anything unrecognised becomes
//! [`ServiceError::Unknown`]. The provider error is always kept as `source`.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::error::ProviderError;
use crate::error::ServiceError;

static RATE_LIMITED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)too\s+many\s+requests|rate[\s_-]?limit|频率过高|请求过于频繁|\b429\b").unwrap()
});

static NOT_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)not\s+found|does\s+not\s+exist|不存在|\b404\b").unwrap());

static TRANSIENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)timed?\s*out|timeout|connection\s+(reset|refused|closed|aborted)|temporar|\b50[234]\b|超时",
    )
    .unwrap()
});

static CONVERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpdf\b|convert|转换").unwrap());

/// Known failure signature found in a library message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    RateLimited,
    NotFound,
    Transient,
    Conversion,
}

/// Matches a free-form failure message against known signatures.
pub fn match_signature(message: &str) -> Option<Signature> {
    if RATE_LIMITED.is_match(message) {
        Some(Signature::RateLimited)
    } else if NOT_FOUND.is_match(message) {
        Some(Signature::NotFound)
    } else if TRANSIENT.is_match(message) {
        Some(Signature::Transient)
    } else if CONVERSION.is_match(message) {
        Some(Signature::Conversion)
    } else {
        None
    }
}

/// Classifies a failure from `fetch(record_id)`.
pub fn classify_fetch_error(record_id: &str, err: ProviderError) -> ServiceError {
    match &err {
        ProviderError::NotFound { id } => ServiceError::RecordNotFound {
            id: id.clone(),
            source: Some(err),
        },
        ProviderError::RateLimited { .. } => ServiceError::ProviderRateLimited { source: Some(err) },
        ProviderError::Timeout | ProviderError::Connection(_) => ServiceError::ProviderTransient {
            detail: err.to_string(),
            source: Some(err),
        },
        ProviderError::Conversion(detail) => ServiceError::ConversionFailed {
            detail: detail.clone(),
            source: Some(err),
        },
        ProviderError::Io(_) => ServiceError::Unknown {
            detail: format!("local I/O failure while fetching {}: {}", record_id, err),
            source: Some(Box::new(err)),
        },
        ProviderError::Library { message } => match match_signature(message) {
            Some(Signature::NotFound) => ServiceError::RecordNotFound {
                id: record_id.to_string(),
                source: Some(err),
            },
            Some(Signature::RateLimited) => {
                ServiceError::ProviderRateLimited { source: Some(err) }
            }
            Some(Signature::Transient) => ServiceError::ProviderTransient {
                detail: message.clone(),
                source: Some(err),
            },
            Some(Signature::Conversion) => ServiceError::ConversionFailed {
                detail: message.clone(),
                source: Some(err),
            },
            None => ServiceError::Unknown {
                detail: message.clone(),
                source: Some(Box::new(err)),
            },
        },
    }
}

/// Classifies a failure from `search(keyword)`.
///
/// Returns `None` when the provider signalled "not found": for searches an
/// empty result is the not-found signal, so the caller should treat it as
/// an empty result set rather than an error.
pub fn classify_search_error(keyword: &str, err: ProviderError) -> Option<ServiceError> {
    match &err {
        ProviderError::NotFound { .. } => None,
        ProviderError::Library { message }
            if match_signature(message) == Some(Signature::NotFound) =>
        {
            None
        }
        _ => Some(match classify_fetch_error(keyword, err) {
            // A search has no record id to report; anything that still looks
            // like "not found" at this point is not one.
            ServiceError::RecordNotFound { source, .. } => ServiceError::Unknown {
                detail: format!("search for {:?} failed", keyword),
                source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
            },
            other => other,
        }),
    }
}
