//! Delivery of fetched artifacts.
//!
//! Stands in for a chat upload: the artifact is copied into
//! `outbox/<group>/<name>`. Direct messages go to `outbox/direct`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use comicrelay_core::Artifact;

use crate::metrics;

const DIRECT_FOLDER: &str = "direct";

#[derive(Debug, Clone)]
pub struct Delivery {
    outbox_dir: PathBuf,
}

impl Delivery {
    pub fn new(outbox_dir: impl Into<PathBuf>) -> Self {
        Self {
            outbox_dir: outbox_dir.into(),
        }
    }

    pub fn outbox_dir(&self) -> &Path {
        &self.outbox_dir
    }

    /// Copies the artifact to its destination and returns the delivered path.
    pub async fn deliver(&self, artifact: &Artifact, group_id: Option<&str>) -> Result<PathBuf> {
        if let Some(group_id) = group_id {
            check_group_id(group_id)?;
        }
        let folder = self.outbox_dir.join(group_id.unwrap_or(DIRECT_FOLDER));
        let target = folder.join(&artifact.name);

        let result = async {
            tokio::fs::create_dir_all(&folder)
                .await
                .with_context(|| format!("Failed to create outbox folder {:?}", folder))?;
            tokio::fs::copy(&artifact.path, &target)
                .await
                .with_context(|| format!("Failed to copy {:?} to {:?}", artifact.path, target))?;
            Ok::<_, anyhow::Error>(())
        }
        .await;

        let label = if result.is_ok() { "delivered" } else { "failed" };
        metrics::DELIVERIES_TOTAL.with_label_values(&[label]).inc();
        result?;

        info!(record_id = %artifact.record_id, dest = %target.display(), "Artifact delivered");
        Ok(target)
    }
}

/// Group ids become a single folder name under the outbox.
pub fn check_group_id(group_id: &str) -> Result<()> {
    if group_id.is_empty()
        || group_id == "."
        || group_id.contains("..")
        || group_id.contains(['/', '\\'])
    {
        bail!("Invalid group id {:?}", group_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_deliver_into_group_folder() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("100001.pdf");
        std::fs::write(&source, b"%PDF").unwrap();

        let delivery = Delivery::new(dir.path().join("outbox"));
        let artifact = Artifact::new("100001", &source);

        let target = delivery.deliver(&artifact, Some("group-1")).await.unwrap();
        assert_eq!(target, dir.path().join("outbox/group-1/100001.pdf"));
        assert!(target.exists());

        let direct = delivery.deliver(&artifact, None).await.unwrap();
        assert_eq!(direct, dir.path().join("outbox/direct/100001.pdf"));
    }

    #[tokio::test]
    async fn test_deliver_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let delivery = Delivery::new(dir.path().join("outbox"));
        let artifact = Artifact::new("1", dir.path().join("gone.pdf"));

        let err = delivery.deliver(&artifact, None).await.unwrap_err();
        assert!(err.to_string().contains("Failed to copy"));
    }

    #[tokio::test]
    async fn test_group_id_cannot_leave_outbox() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("100001.pdf");
        std::fs::write(&source, b"%PDF").unwrap();
        let delivery = Delivery::new(dir.path().join("outbox"));
        let artifact = Artifact::new("100001", &source);

        for group in ["../escaped", "..", "a/b", "a\\b", ".", ""] {
            let err = delivery.deliver(&artifact, Some(group)).await.unwrap_err();
            assert!(err.to_string().contains("Invalid group id"), "group {:?}", group);
        }
        assert!(!dir.path().join("escaped").exists());
        assert!(!dir.path().join("outbox").exists());

        assert!(check_group_id("群-123").is_ok());
    }
}
