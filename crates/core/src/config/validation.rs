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

fn check_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value < 100 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
    }
    if value > 300_000 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must not exceed 5 minutes (300000ms)".into() });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - any timeout is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `llm_base_url` is empty
    /// - `heuristics.price_pattern` does not compile
    /// - `heuristics.max_section_chars` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        check_timeout("timeout_ms", self.timeout_ms)?;
        check_timeout("render_timeout_ms", self.render_timeout_ms)?;
        check_timeout("llm_timeout_ms", self.llm_timeout_ms)?;

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.llm_base_url.is_empty() {
            return Err(ConfigError::Invalid { field: "llm_base_url".into(), reason: "must not be empty".into() });
        }

        if let Err(e) = regex::Regex::new(&self.heuristics.price_pattern) {
            return Err(ConfigError::Invalid { field: "heuristics.price_pattern".into(), reason: e.to_string() });
        }

        if self.heuristics.max_section_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "heuristics.max_section_chars".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.heuristics.menu_keywords.is_empty() {
            tracing::warn!("heuristics.menu_keywords is empty; only price matches and images will mark menu content");
        }

        if !self.render_enabled {
            tracing::warn!("render fallback disabled; script-rendered menus will not be reachable");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeuristicsConfig;

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
        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() }; // 51MB
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
    fn test_validate_render_timeout_exceeds_limit() {
        let config = AppConfig { render_timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "render_timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_bad_price_pattern() {
        let heuristics = HeuristicsConfig { price_pattern: "(\\d+".into(), ..Default::default() };
        let config = AppConfig { heuristics, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "heuristics.price_pattern"));
    }

    #[test]
    fn test_validate_zero_section_window() {
        let heuristics = HeuristicsConfig { max_section_chars: 0, ..Default::default() };
        let config = AppConfig { heuristics, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "heuristics.max_section_chars"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, render_timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
