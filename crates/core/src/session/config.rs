//! Selection session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for per-user selection sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Results kept per session; longer result sets are truncated.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Seconds a listed session stays selectable. `None` means forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

fn default_max_results() -> usize {
    5
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            ttl_secs: None,
        }
    }
}

impl SessionConfig {
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl_secs = Some(secs);
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.max_results, 5);
        assert!(config.ttl().is_none());
    }

    #[test]
    fn test_deserialize() {
        let config: SessionConfig = toml::from_str("ttl_secs = 300").unwrap();
        assert_eq!(config.max_results, 5);
        assert_eq!(config.ttl(), Some(Duration::from_secs(300)));
    }
}
