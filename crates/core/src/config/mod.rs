//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TABULA_*)
//! 2. TOML config file (if TABULA_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// What to do when the rating column cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingFailure {
    /// Abort the whole export with `Error::RatingParse`.
    #[default]
    Abort,
    /// Log a warning and emit an absent cell for that row.
    Absent,
}

/// Decoding rule for a rating encoded in a link's `class` attribute,
/// e.g. `class="rating-45"` for 4.5 stars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Column name that triggers rating decoding on link columns.
    #[serde(default = "default_rating_column")]
    pub column: String,

    /// Prefix stripped (repeatedly) from the front of the class value.
    #[serde(default = "default_rating_prefix")]
    pub prefix: String,

    /// The parsed integer is divided by this value.
    #[serde(default = "default_rating_divisor")]
    pub divisor: f64,

    /// Policy for a missing node or non-numeric remainder.
    #[serde(default)]
    pub on_error: RatingFailure,
}

fn default_rating_column() -> String {
    "Rating".into()
}

fn default_rating_prefix() -> String {
    "rating-".into()
}

fn default_rating_divisor() -> f64 {
    10.0
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            column: default_rating_column(),
            prefix: default_rating_prefix(),
            divisor: default_rating_divisor(),
            on_error: RatingFailure::Abort,
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TABULA_*)
/// 2. TOML config file (if TABULA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-Agent string for HTTP requests.
    ///
    /// Set via TABULA_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per page.
    ///
    /// Set via TABULA_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via TABULA_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects followed per page.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Page number of the first listing page. Some sites count from 0.
    ///
    /// Set via TABULA_FIRST_PAGE environment variable.
    #[serde(default = "default_first_page")]
    pub first_page: u32,

    /// Upper bound on fetched pages per run. Unbounded when unset.
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Pause between consecutive page requests, in milliseconds.
    #[serde(default)]
    pub page_delay_ms: u64,

    /// Fetch page N+1 while rows of page N are extracted.
    #[serde(default)]
    pub prefetch: bool,

    /// Suggested file stem offered to the destination picker.
    #[serde(default = "default_export_name")]
    pub export_name: String,

    /// Rating decoding rule.
    ///
    /// Nested keys use `__`, e.g. TABULA_RATING__ON_ERROR=absent.
    #[serde(default)]
    pub rating: RatingConfig,
}

fn default_user_agent() -> String {
    "tabula/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_first_page() -> u32 {
    1
}

fn default_export_name() -> String {
    "tabula-export".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            first_page: default_first_page(),
            max_pages: None,
            page_delay_ms: 0,
            prefetch: false,
            export_name: default_export_name(),
            rating: RatingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay between page requests as Duration.
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TABULA_`
    /// 2. TOML file from `TABULA_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TABULA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TABULA_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.user_agent, "tabula/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.first_page, 1);
        assert!(config.max_pages.is_none());
        assert_eq!(config.page_delay_ms, 0);
        assert!(!config.prefetch);
        assert_eq!(config.export_name, "tabula-export");
        assert_eq!(config.rating.column, "Rating");
        assert_eq!(config.rating.prefix, "rating-");
        assert_eq!(config.rating.divisor, 10.0);
        assert_eq!(config.rating.on_error, RatingFailure::Abort);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.page_delay(), Duration::ZERO);
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TABULA_FIRST_PAGE", "0");
            jail.set_env("TABULA_PREFETCH", "true");
            jail.set_env("TABULA_RATING__ON_ERROR", "absent");
            jail.set_env("TABULA_RATING__PREFIX", "stars-");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.first_page, 0);
            assert!(config.prefetch);
            assert_eq!(config.rating.on_error, RatingFailure::Absent);
            assert_eq!(config.rating.prefix, "stars-");
            assert_eq!(config.rating.column, "Rating");
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "tabula.toml",
                r#"
                    max_pages = 3
                    page_delay_ms = 250

                    [rating]
                    divisor = 2.0
                "#,
            )?;
            jail.set_env("TABULA_CONFIG_FILE", "tabula.toml");
            jail.set_env("TABULA_MAX_PAGES", "7");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.max_pages, Some(7));
            assert_eq!(config.page_delay_ms, 250);
            assert_eq!(config.rating.divisor, 2.0);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TABULA_TIMEOUT_MS", "5");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
            Ok(())
        });
    }
}
