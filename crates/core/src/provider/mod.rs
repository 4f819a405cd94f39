//! Content provider abstraction.
//!
//! This module provides the [`ContentProvider`] trait through which the core
//! searches and fetches content, the record/artifact value types, the
//! mapping step from loosely-typed provider payloads into [`ContentRecord`],
//! and the classification of provider failures into the core's error
//! taxonomy.

mod catalog;
mod classify;
mod error;
mod traits;
mod types;

pub use catalog::CatalogProvider;
pub use classify::{classify_fetch_error, classify_search_error, match_signature, Signature};
pub use error::ProviderError;
pub use traits::ContentProvider;
pub use types::{map_raw_records, Artifact, ContentRecord, RecordError, SearchResultSet};
