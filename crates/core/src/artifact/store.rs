//! Local storage for fetched artifacts.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::types::{CleanupPolicy, DisposeOutcome};
use crate::error::ServiceError;
use crate::metrics;
use crate::provider::Artifact;

/// Owns the download directory and the deletion policy for artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    download_dir: PathBuf,
    policy: CleanupPolicy,
}

impl ArtifactStore {
    pub fn new(download_dir: impl Into<PathBuf>, policy: CleanupPolicy) -> Self {
        Self {
            download_dir: download_dir.into(),
            policy,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Creates the download directory if needed.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.download_dir).await
    }

    /// Where a provider is expected to place the artifact for `record_id`.
    pub fn expected_path(&self, record_id: &str) -> PathBuf {
        self.download_dir.join(format!("{}.pdf", record_id))
    }

    /// Finds an artifact for `record_id` in the download directory.
    ///
    /// Prefers `{id}.pdf`; otherwise takes the first PDF (by name) whose stem
    /// contains the id as a whole token, e.g. `Title [422866].pdf`. The id
    /// `1` does not match `100001.pdf`. Empty ids and ids with path
    /// separators never match.
    pub async fn locate(&self, record_id: &str) -> Option<Artifact> {
        if record_id.is_empty() || record_id.contains(['/', '\\']) {
            return None;
        }

        let expected = self.expected_path(record_id);
        if is_file(&expected).await {
            return Some(Artifact::new(record_id, expected));
        }

        let mut entries = match tokio::fs::read_dir(&self.download_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.download_dir.display(), "Cannot list download dir: {}", e);
                return None;
            }
        };

        let mut candidates = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let name_matches = path
                .file_stem()
                .and_then(|n| n.to_str())
                .is_some_and(|n| contains_token(n, record_id));
            let is_pdf = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            if name_matches && is_pdf && is_file(&path).await {
                candidates.push(path);
            }
        }

        candidates.sort();
        candidates
            .into_iter()
            .next()
            .map(|path| Artifact::new(record_id, path))
    }

    /// Checks that the artifact's backing file exists.
    pub async fn verify(&self, artifact: &Artifact) -> Result<(), ServiceError> {
        if is_file(&artifact.path).await {
            Ok(())
        } else {
            Err(ServiceError::ArtifactMissing {
                path: artifact.path.clone(),
            })
        }
    }

    /// Applies the cleanup policy to a delivered (or failed-to-deliver) artifact.
    ///
    /// Safe to call repeatedly; never fails.
    pub async fn dispose(&self, artifact: &Artifact) -> DisposeOutcome {
        let outcome = match self.policy {
            CleanupPolicy::Retain => {
                debug!(path = %artifact.path.display(), "Retaining artifact");
                DisposeOutcome::Retained
            }
            CleanupPolicy::DeleteAfterDelivery => match tokio::fs::remove_file(&artifact.path).await {
                Ok(()) => {
                    info!(record_id = %artifact.record_id, path = %artifact.path.display(), "Deleted artifact");
                    DisposeOutcome::Deleted
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(path = %artifact.path.display(), "Artifact already absent, nothing to delete");
                    DisposeOutcome::AlreadyAbsent
                }
                Err(e) => {
                    error!(path = %artifact.path.display(), "Failed to delete artifact: {}", e);
                    DisposeOutcome::Failed
                }
            },
        };

        metrics::DISPOSALS.with_label_values(&[outcome.as_str()]).inc();
        outcome
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Whether `id` occurs in `name` with no alphanumeric character on either side.
fn contains_token(name: &str, id: &str) -> bool {
    name.match_indices(id).any(|(start, _)| {
        let before = name[..start].chars().next_back();
        let after = name[start + id.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, policy: CleanupPolicy) -> ArtifactStore {
        ArtifactStore::new(dir.path().join("downloads"), policy)
    }

    #[tokio::test]
    async fn test_dispose_deletes_then_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, CleanupPolicy::DeleteAfterDelivery);
        store.ensure_dir().await.unwrap();

        let path = store.expected_path("100001");
        std::fs::write(&path, b"pdf").unwrap();
        let artifact = Artifact::new("100001", &path);

        assert_eq!(store.dispose(&artifact).await, DisposeOutcome::Deleted);
        assert!(!path.exists());
        assert_eq!(store.dispose(&artifact).await, DisposeOutcome::AlreadyAbsent);
    }

    #[tokio::test]
    async fn test_dispose_retains() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, CleanupPolicy::Retain);
        store.ensure_dir().await.unwrap();

        let path = store.expected_path("1");
        std::fs::write(&path, b"pdf").unwrap();

        assert_eq!(
            store.dispose(&Artifact::new("1", &path)).await,
            DisposeOutcome::Retained
        );
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_dispose_directory_fails_without_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, CleanupPolicy::DeleteAfterDelivery);
        store.ensure_dir().await.unwrap();

        let outcome = store
            .dispose(&Artifact::new("dir", store.download_dir()))
            .await;
        assert_eq!(outcome, DisposeOutcome::Failed);
        assert!(store.download_dir().exists());
    }

    #[tokio::test]
    async fn test_verify() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, CleanupPolicy::Retain);
        store.ensure_dir().await.unwrap();

        let artifact = Artifact::new("7", store.expected_path("7"));
        assert!(matches!(
            store.verify(&artifact).await,
            Err(ServiceError::ArtifactMissing { .. })
        ));

        std::fs::write(&artifact.path, b"pdf").unwrap();
        assert!(store.verify(&artifact).await.is_ok());
    }

    #[tokio::test]
    async fn test_locate_prefers_exact_name_then_falls_back() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, CleanupPolicy::Retain);
        store.ensure_dir().await.unwrap();

        assert!(store.locate("422866").await.is_none());

        let titled = store.download_dir().join("测试漫画 [422866].pdf");
        std::fs::write(&titled, b"pdf").unwrap();
        std::fs::write(store.download_dir().join("422866.txt"), b"no").unwrap();
        assert_eq!(store.locate("422866").await.unwrap().path, titled);

        std::fs::write(store.expected_path("422866"), b"pdf").unwrap();
        assert_eq!(
            store.locate("422866").await.unwrap().path,
            store.expected_path("422866")
        );
    }

    #[tokio::test]
    async fn test_locate_ignores_other_records_files() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, CleanupPolicy::Retain);
        store.ensure_dir().await.unwrap();

        std::fs::write(store.expected_path("100001"), b"pdf").unwrap();
        std::fs::write(store.download_dir().join("Title 21.pdf"), b"pdf").unwrap();

        assert!(store.locate("1").await.is_none());
        assert!(store.locate("00001").await.is_none());
        assert!(store.locate("2").await.is_none());
        assert!(store.locate("").await.is_none());
        assert!(store.locate("../100001").await.is_none());
        assert_eq!(
            store.locate("21").await.unwrap().path,
            store.download_dir().join("Title 21.pdf")
        );
    }

    #[test]
    fn test_contains_token() {
        assert!(contains_token("测试漫画 [422866]", "422866"));
        assert!(contains_token("422866", "422866"));
        assert!(contains_token("a_1-b", "1"));
        assert!(!contains_token("100001", "1"));
        assert!(!contains_token("漫画1", "1"));
        assert!(contains_token("100001 1", "1"));
    }

    #[tokio::test]
    async fn test_locate_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, CleanupPolicy::Retain);
        assert!(store.locate("1").await.is_none());
    }
}
