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
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `export_name` is empty
    /// - `max_pages` is set to 0
    /// - the rating prefix is empty or the divisor is zero/non-finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_redirects > 20 {
            return Err(invalid("max_redirects", "must not exceed 20"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.max_pages == Some(0) {
            return Err(invalid("max_pages", "must be at least 1 when set"));
        }

        if self.page_delay_ms > 60_000 {
            return Err(invalid("page_delay_ms", "must not exceed 60000ms"));
        }

        if self.export_name.trim().is_empty() {
            return Err(invalid("export_name", "must not be empty"));
        }

        // An empty prefix would never stop stripping.
        if self.rating.prefix.is_empty() {
            return Err(invalid("rating.prefix", "must not be empty"));
        }
        if self.rating.column.is_empty() {
            return Err(invalid("rating.column", "must not be empty"));
        }
        if !self.rating.divisor.is_finite() || self.rating.divisor == 0.0 {
            return Err(invalid("rating.divisor", "must be a finite, non-zero number"));
        }

        if self.prefetch && self.page_delay_ms > 0 {
            tracing::warn!(
                page_delay_ms = self.page_delay_ms,
                "prefetch is enabled; the page delay is applied inside the prefetch task"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_max_pages_zero() {
        let config = AppConfig { max_pages: Some(0), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_pages"));
    }

    #[test]
    fn test_validate_zero_based_first_page() {
        let config = AppConfig { first_page: 0, max_pages: Some(1), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rating_prefix_empty() {
        let mut config = AppConfig::default();
        config.rating.prefix.clear();
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "rating.prefix"));
    }

    #[test]
    fn test_validate_rating_divisor() {
        let mut config = AppConfig::default();
        config.rating.divisor = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "rating.divisor"));

        config.rating.divisor = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "rating.divisor"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, page_delay_ms: 60_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
