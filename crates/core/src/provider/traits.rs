//! The content provider port.

use async_trait::async_trait;

use super::error::ProviderError;
use super::types::{Artifact, ContentRecord};

/// A remote source of content that can be searched and fetched.
///
/// Calls may be slow; implementations must not block the calling task
/// (offload blocking library calls with `tokio::task::spawn_blocking`).
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Searches for records matching `keyword`.
    ///
    /// An empty list means nothing matched; it is not an error.
    async fn search(&self, keyword: &str) -> Result<Vec<ContentRecord>, ProviderError>;

    /// Fetches a record and converts it into a deliverable artifact.
    async fn fetch(&self, id: &str) -> Result<Artifact, ProviderError>;
}
