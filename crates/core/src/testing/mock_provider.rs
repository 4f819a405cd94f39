//! Mock content provider for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::provider::{Artifact, ContentProvider, ContentRecord, ProviderError};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    /// The record that was fetched.
    pub record_id: String,
    /// When the provider was entered.
    pub started_at: Instant,
    /// When the provider returned. `None` if the call was cancelled.
    pub finished_at: Option<Instant>,
}

/// Decrements the in-flight counter even if the fetch is cancelled.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the ContentProvider trait.
///
/// Provides controllable behavior for testing:
/// - Search over a configurable record list (substring match on title)
/// - Fetch writes a real `{id}.pdf` into the output directory
/// - Simulate failures, missing records and slow fetches
/// - Track fetches and peak concurrency for assertions
///
/// # Example
///
/// ```rust,ignore
/// use comicrelay_core::testing::{MockProvider, fixtures};
///
/// let provider = MockProvider::new(dir.path());
/// provider.set_records(fixtures::sample_records()).await;
/// provider.set_fetch_delay(Duration::from_millis(50)).await;
///
/// let artifact = provider.fetch("100001").await?;
/// assert!(artifact.path.exists());
/// assert_eq!(provider.fetch_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    output_dir: PathBuf,
    /// Records searched over.
    records: Arc<RwLock<Vec<ContentRecord>>>,
    /// Ids that fetch reports as nonexistent.
    missing: Arc<RwLock<HashSet<String>>>,
    /// Recorded fetches.
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    /// Recorded search keywords.
    searches: Arc<RwLock<Vec<String>>>,
    /// If set, the next search fails with this error.
    next_search_error: Arc<RwLock<Option<ProviderError>>>,
    /// If set, the next fetch fails with this error.
    next_fetch_error: Arc<RwLock<Option<ProviderError>>>,
    /// Simulated fetch latency.
    fetch_delay: Arc<RwLock<Option<Duration>>>,
    /// When false, fetch reports success without writing the file.
    write_artifacts: Arc<RwLock<bool>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a mock provider writing artifacts into `output_dir`.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            records: Arc::new(RwLock::new(Vec::new())),
            missing: Arc::new(RwLock::new(HashSet::new())),
            fetches: Arc::new(RwLock::new(Vec::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            next_search_error: Arc::new(RwLock::new(None)),
            next_fetch_error: Arc::new(RwLock::new(None)),
            fetch_delay: Arc::new(RwLock::new(None)),
            write_artifacts: Arc::new(RwLock::new(true)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the records searched over.
    pub async fn set_records(&self, records: Vec<ContentRecord>) {
        *self.records.write().await = records;
    }

    /// Make fetches of `id` fail the way the provider library reports unknown ids.
    pub async fn add_missing(&self, id: &str) {
        self.missing.write().await.insert(id.to_string());
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_search_error(&self, error: ProviderError) {
        *self.next_search_error.write().await = Some(error);
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_fetch_error(&self, error: ProviderError) {
        *self.next_fetch_error.write().await = Some(error);
    }

    /// Set simulated fetch latency.
    pub async fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.write().await = Some(delay);
    }

    /// Whether fetch actually writes the artifact file.
    pub async fn set_write_artifacts(&self, write: bool) {
        *self.write_artifacts.write().await = write;
    }

    /// Get recorded fetches, in call order.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Get the number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    /// Get recorded search keywords.
    pub async fn recorded_searches(&self) -> Vec<String> {
        self.searches.read().await.clone()
    }

    /// Fetches currently inside the provider.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of fetches ever inside the provider at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn finish_fetch(&self, index: usize) {
        if let Some(fetch) = self.fetches.write().await.get_mut(index) {
            fetch.finished_at = Some(Instant::now());
        }
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, keyword: &str) -> Result<Vec<ContentRecord>, ProviderError> {
        self.searches.write().await.push(keyword.to_string());

        if let Some(error) = self.next_search_error.write().await.take() {
            return Err(error);
        }

        let needle = keyword.to_lowercase();
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn fetch(&self, record_id: &str) -> Result<Artifact, ProviderError> {
        let _in_flight = InFlight::enter(&self.in_flight, &self.peak);
        let index = {
            let mut fetches = self.fetches.write().await;
            fetches.push(RecordedFetch {
                record_id: record_id.to_string(),
                started_at: Instant::now(),
                finished_at: None,
            });
            fetches.len() - 1
        };

        let delay = *self.fetch_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.produce(record_id).await;
        self.finish_fetch(index).await;
        result
    }
}

impl MockProvider {
    async fn produce(&self, record_id: &str) -> Result<Artifact, ProviderError> {
        if let Some(error) = self.next_fetch_error.write().await.take() {
            return Err(error);
        }
        if self.missing.read().await.contains(record_id) {
            return Err(ProviderError::library(format!(
                "album {} not found",
                record_id
            )));
        }

        let path = self.output_dir.join(format!("{}.pdf", record_id));
        if *self.write_artifacts.read().await {
            tokio::fs::create_dir_all(&self.output_dir).await?;
            tokio::fs::write(&path, format!("%PDF-1.4 mock {}", record_id)).await?;
        }
        Ok(Artifact::new(record_id, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_search_filters_by_title() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new(dir.path());
        provider
            .set_records(vec![
                ContentRecord::new("1", "Alpha"),
                ContentRecord::new("2", "Beta"),
            ])
            .await;

        let found = provider.search("alp").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(provider.recorded_searches().await, vec!["alp".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new(dir.path());

        let artifact = provider.fetch("42").await.unwrap();
        assert!(artifact.path.exists());

        let fetches = provider.recorded_fetches().await;
        assert_eq!(fetches.len(), 1);
        assert!(fetches[0].finished_at.is_some());
        assert_eq!(provider.in_flight(), 0);
        assert_eq!(provider.peak_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_one_shot() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new(dir.path());
        provider.set_next_fetch_error(ProviderError::Timeout).await;

        assert!(matches!(
            provider.fetch("1").await,
            Err(ProviderError::Timeout)
        ));
        assert!(provider.fetch("1").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_id() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new(dir.path());
        provider.add_missing("nope").await;

        let err = provider.fetch("nope").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
