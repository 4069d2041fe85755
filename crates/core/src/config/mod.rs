//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LUNCHBOX_*)
//! 2. TOML config file (if LUNCHBOX_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod heuristics;
mod validation;

pub use heuristics::HeuristicsConfig;
pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LUNCHBOX_*)
/// 2. TOML config file (if LUNCHBOX_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via LUNCHBOX_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests and the headless browser.
    ///
    /// Set via LUNCHBOX_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per static request.
    ///
    /// Set via LUNCHBOX_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Static fetch timeout in milliseconds.
    ///
    /// Set via LUNCHBOX_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether the rendered (headless browser) fallback is enabled.
    ///
    /// Set via LUNCHBOX_RENDER_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub render_enabled: bool,

    /// Navigation timeout for the rendered fetch in milliseconds.
    ///
    /// Set via LUNCHBOX_RENDER_TIMEOUT_MS environment variable.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Final settle pause before the rendered document is captured.
    ///
    /// Set via LUNCHBOX_RENDER_SETTLE_MS environment variable.
    #[serde(default = "default_render_settle_ms")]
    pub render_settle_ms: u64,

    /// Interval between background cache sweeps; 0 disables the task.
    ///
    /// Set via LUNCHBOX_SWEEP_INTERVAL_SECS environment variable.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// API key for the structured-extraction endpoint.
    ///
    /// Set via LUNCHBOX_LLM_API_KEY environment variable.
    #[serde(default)]
    pub llm_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible chat completions API.
    ///
    /// Set via LUNCHBOX_LLM_BASE_URL environment variable.
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,

    /// Model name sent with every extraction request.
    ///
    /// Set via LUNCHBOX_LLM_MODEL environment variable.
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Extraction request timeout in milliseconds.
    ///
    /// Set via LUNCHBOX_LLM_TIMEOUT_MS environment variable.
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,

    /// Menu detection policy shared by the extractor and the classifier.
    ///
    /// Set via LUNCHBOX_HEURISTICS__* environment variables.
    #[serde(default)]
    pub heuristics: HeuristicsConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./lunchbox-cache.sqlite")
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        .into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_render_timeout_ms() -> u64 {
    20_000
}

fn default_render_settle_ms() -> u64 {
    2_000
}

fn default_sweep_interval_secs() -> u64 {
    3_600
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}

fn default_llm_timeout_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            render_enabled: true,
            render_timeout_ms: default_render_timeout_ms(),
            render_settle_ms: default_render_settle_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            llm_api_key: None,
            llm_base_url: default_llm_base_url(),
            llm_model: default_llm_model(),
            llm_timeout_ms: default_llm_timeout_ms(),
            heuristics: HeuristicsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Static fetch timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Rendered-fetch navigation timeout.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Structured-extraction request timeout.
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    /// Background sweep period, if the sweep task is enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LUNCHBOX_`
    /// 2. TOML file from `LUNCHBOX_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("LUNCHBOX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LUNCHBOX_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the extraction API key is available.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_llm_api_key(&self) -> Result<&str, ConfigError> {
        self.llm_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "llm_api_key".into(),
                hint: "Set LUNCHBOX_LLM_API_KEY environment variable".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./lunchbox-cache.sqlite"));
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 10_000);
        assert!(config.render_enabled);
        assert_eq!(config.render_timeout_ms, 20_000);
        assert_eq!(config.render_settle_ms, 2_000);
        assert_eq!(config.sweep_interval_secs, 3_600);
        assert!(config.llm_api_key.is_none());
        assert_eq!(config.llm_model, "gpt-4o-mini");
    }

    #[test]
    fn test_timeout_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
        assert_eq!(config.render_timeout(), Duration::from_millis(20_000));
        assert_eq!(config.llm_timeout(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_sweep_interval_disabled_at_zero() {
        let config = AppConfig { sweep_interval_secs: 0, ..Default::default() };
        assert!(config.sweep_interval().is_none());
        assert_eq!(AppConfig::default().sweep_interval(), Some(Duration::from_secs(3_600)));
    }

    #[test]
    fn test_require_llm_api_key_missing() {
        let config = AppConfig::default();
        let result = config.require_llm_api_key();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));

        let config = AppConfig { llm_api_key: Some(String::new()), ..Default::default() };
        assert!(config.require_llm_api_key().is_err());
    }

    #[test]
    fn test_require_llm_api_key_present() {
        let config = AppConfig { llm_api_key: Some("test-key".into()), ..Default::default() };
        let result = config.require_llm_api_key();
        assert_eq!(result.unwrap(), "test-key");
    }

    #[test]
    fn test_load_nested_heuristics_from_toml() {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(
                r#"
                timeout_ms = 5000

                [heuristics]
                min_text_chars = 40
                menu_keywords = ["polévka"]
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.heuristics.min_text_chars, 40);
        assert_eq!(config.heuristics.menu_keywords, vec!["polévka".to_string()]);
        assert_eq!(config.heuristics.max_section_chars, HeuristicsConfig::default().max_section_chars);
    }
}
