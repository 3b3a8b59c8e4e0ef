//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - either timeout is less than 100ms or exceeds 5 minutes
    /// - any TTL is zero
    /// - `user_agent` is empty
    /// - `github_api_url` is not an http(s) URL
    ///
    /// Returns `ConfigError::Missing` if `cache_dir` or `frameworks_dir` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        for (field, value) in [("timeout_ms", self.timeout_ms), ("github_timeout_ms", self.github_timeout_ms)] {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 300_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        for (field, value) in [
            ("ttl.docs_secs", self.ttl.docs_secs),
            ("ttl.examples_secs", self.ttl.examples_secs),
            ("ttl.search_index_secs", self.ttl.search_index_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !(self.github_api_url.starts_with("https://") || self.github_api_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "github_api_url".into(),
                reason: "must be an http(s) URL".into(),
            });
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_dir".into(),
                hint: "Set AUGMENTS_CACHE_DIR environment variable".into(),
            });
        }

        if self.frameworks_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "frameworks_dir".into(),
                hint: "Set AUGMENTS_FRAMEWORKS_DIR environment variable".into(),
            });
        }

        if self.context_excerpt_chars < 200 {
            tracing::warn!(
                context_excerpt_chars = self.context_excerpt_chars,
                "context_excerpt_chars is very small; combined context documents will be mostly headers"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_max_bytes_exceeds_limit() {
        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_github_timeout_exceeds_limit() {
        let config = AppConfig { github_timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "github_timeout_ms"));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = AppConfig::default();
        config.ttl.examples_secs = 0;
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "ttl.examples_secs"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_github_api_url_scheme() {
        let config = AppConfig { github_api_url: "ftp://api.github.com".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "github_api_url"));
    }

    #[test]
    fn test_validate_empty_cache_dir() {
        let config = AppConfig { cache_dir: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "cache_dir"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, github_timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
