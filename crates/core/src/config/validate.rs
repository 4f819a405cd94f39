use regex_lite::Regex;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Limiter capacity, job timeout and session size are not 0
/// - Session TTL, if set, is not 0
/// - Record id pattern, if set, compiles
/// - Download directory is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.jobs.max_concurrent_downloads == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.max_concurrent_downloads cannot be 0".to_string(),
        ));
    }

    if config.jobs.job_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.job_timeout_secs cannot be 0".to_string(),
        ));
    }

    if let Some(pattern) = &config.jobs.record_id_pattern {
        Regex::new(pattern).map_err(|e| {
            ConfigError::ValidationError(format!("jobs.record_id_pattern is invalid: {}", e))
        })?;
    }

    if config.sessions.max_results == 0 {
        return Err(ConfigError::ValidationError(
            "sessions.max_results cannot be 0".to_string(),
        ));
    }

    if config.sessions.ttl_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "sessions.ttl_secs cannot be 0 (omit it to disable expiry)".to_string(),
        ));
    }

    if config.storage.download_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.download_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(config: &Config) -> String {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_capacity_fails() {
        let mut config = Config::default();
        config.jobs.max_concurrent_downloads = 0;
        assert!(invalid(&config).contains("max_concurrent_downloads"));
    }

    #[test]
    fn test_validate_zero_values_fail() {
        let mut config = Config::default();
        config.jobs.job_timeout_secs = 0;
        assert!(invalid(&config).contains("job_timeout_secs"));

        let mut config = Config::default();
        config.sessions.max_results = 0;
        assert!(invalid(&config).contains("max_results"));

        let mut config = Config::default();
        config.sessions.ttl_secs = Some(0);
        assert!(invalid(&config).contains("ttl_secs"));
    }

    #[test]
    fn test_validate_record_id_pattern() {
        let mut config = Config::default();
        config.jobs.record_id_pattern = Some(r"^\d+$".to_string());
        assert!(validate_config(&config).is_ok());

        config.jobs.record_id_pattern = Some("[".to_string());
        assert!(invalid(&config).contains("record_id_pattern"));
    }
}
