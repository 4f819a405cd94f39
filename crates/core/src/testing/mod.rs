//! Testing utilities and mock implementations.
//!
//! Provides a mock [`ContentProvider`](crate::provider::ContentProvider) so the
//! orchestrator and session store can be exercised without a real provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use comicrelay_core::testing::{MockProvider, fixtures};
//!
//! let provider = MockProvider::new(dir.path());
//! provider.set_records(fixtures::sample_records()).await;
//! provider.add_missing("does-not-exist").await;
//!
//! // Hand Arc::new(provider.clone()) to a JobOrchestrator...
//! ```

mod mock_provider;

pub use mock_provider::{MockProvider, RecordedFetch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::provider::{ContentRecord, SearchResultSet};

    /// Create a test record with reasonable defaults.
    pub fn record(id: &str, title: &str) -> ContentRecord {
        ContentRecord::new(id, title)
            .with_author("测试作者")
            .with_tags(["测试"])
    }

    /// Three records whose titles all contain "示例", ids 100001..=100003.
    pub fn sample_records() -> Vec<ContentRecord> {
        vec![
            record("100001", "示例漫画一"),
            record("100002", "示例漫画二"),
            record("100003", "示例漫画三"),
        ]
    }

    /// A search for "示例" returning [`sample_records`].
    pub fn sample_results() -> SearchResultSet {
        SearchResultSet::new("示例", sample_records())
    }
}
