use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::artifact::CleanupPolicy;
use crate::orchestrator::JobsConfig;
use crate::session::SessionConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Local catalog provider (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,
}

/// Artifact storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Where providers write fetched artifacts
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Delete artifacts once delivery was attempted
    #[serde(default = "default_delete_after_delivery")]
    pub delete_after_delivery: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            delete_after_delivery: default_delete_after_delivery(),
        }
    }
}

impl StorageConfig {
    pub fn cleanup_policy(&self) -> CleanupPolicy {
        CleanupPolicy::from_delete_flag(self.delete_after_delivery)
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_delete_after_delivery() -> bool {
    true
}

/// Local catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// TOML file with `[[records]]` entries
    pub path: PathBuf,
}
