//! Job orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for fetch jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Maximum fetch jobs holding a permit at once.
    /// When the limit is reached, new jobs wait until a permit is free.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Wall-clock bound on a single provider fetch (seconds).
    /// Time spent waiting for a permit does not count.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Optional pattern record ids must match before a job is started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id_pattern: Option<String>,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_job_timeout() -> u64 {
    600 // 10 minutes
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent(),
            job_timeout_secs: default_job_timeout(),
            record_id_pattern: None,
        }
    }
}

impl JobsConfig {
    /// Sets the permit pool capacity.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max;
        self
    }

    /// Sets the per-fetch timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// Sets the record id pattern.
    pub fn with_record_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.record_id_pattern = Some(pattern.into());
        self
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = JobsConfig::default();
        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.job_timeout(), Duration::from_secs(600));
        assert!(config.record_id_pattern.is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: JobsConfig = toml::from_str("max_concurrent_downloads = 1").unwrap();
        assert_eq!(config.max_concurrent_downloads, 1);
        assert_eq!(config.job_timeout_secs, 600);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            max_concurrent_downloads = 5
            job_timeout_secs = 30
            record_id_pattern = '^\d{6}$'
        "#;
        let config: JobsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_concurrent_downloads, 5);
        assert_eq!(config.job_timeout_secs, 30);
        assert_eq!(config.record_id_pattern.as_deref(), Some(r"^\d{6}$"));
    }

    #[test]
    fn test_builder() {
        let config = JobsConfig::default()
            .with_max_concurrent(1)
            .with_timeout_secs(5)
            .with_record_id_pattern("^x$");
        assert_eq!(config.max_concurrent_downloads, 1);
        assert_eq!(config.job_timeout(), Duration::from_secs(5));
        assert!(config.record_id_pattern.is_some());
    }
}
