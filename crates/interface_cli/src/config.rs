//! Application configuration
//!
//! Sources, later overriding earlier:
//!
//! 1. Built-in defaults
//! 2. `prior-auth.{toml,yaml,json}` in the working directory, if present
//! 3. An explicit file passed with `--config`
//! 4. `PRIOR_AUTH_*` environment variables, `__` separating nested keys
//!    (`PRIOR_AUTH_DEFAULTS__SERVICE_TYPE_CODE=1`)

use std::path::Path;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};

use core_kernel::CoreError;
use domain_prior_auth::{DefaultsConfig, PollPolicy};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PRIOR_AUTH";

/// Base name of the optional configuration file
pub const CONFIG_FILE: &str = "prior-auth";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Partner code defaults for outbound mapping
    pub defaults: DefaultsConfig,
    /// Status polling policy
    pub polling: PollPolicy,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            polling: PollPolicy::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the default file and environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Loads configuration, optionally layering an explicit file
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::with_name(CONFIG_FILE).required(false));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        Self::build(builder.add_source(environment()))
    }

    /// Loads configuration from TOML text only
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from_str(contents, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Checks values the type system cannot
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.polling.max_attempts == 0 {
            return Err(CoreError::configuration("polling.max_attempts must be at least 1"));
        }
        if !self.polling.backoff_multiplier.is_finite() || self.polling.backoff_multiplier < 1.0 {
            return Err(CoreError::configuration(format!(
                "polling.backoff_multiplier must be a finite value >= 1.0, got {}",
                self.polling.backoff_multiplier
            )));
        }
        if self.polling.max_delay_ms < self.polling.delay_ms {
            return Err(CoreError::configuration(format!(
                "polling.max_delay_ms ({}) is below polling.delay_ms ({})",
                self.polling.max_delay_ms, self.polling.delay_ms
            )));
        }
        if self.defaults.default_quantity.trim().parse::<u32>().is_err() {
            return Err(CoreError::configuration(format!(
                "defaults.default_quantity must be a whole number, got '{}'",
                self.defaults.default_quantity
            )));
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_overrides() {
        let config = AppConfig::from_toml(
            r#"
            log_level = "debug"

            [defaults]
            service_type_code = "1"
            diagnosis_default_code = "R69"
            fallback_window_days = 30

            [polling]
            max_attempts = 3
            delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.defaults.service_type_code, "1");
        assert_eq!(config.defaults.diagnosis_default_code.as_deref(), Some("R69"));
        assert_eq!(config.defaults.fallback_window_days, 30);
        assert_eq!(config.defaults.request_type_code, "HS");
        assert_eq!(config.polling.max_attempts, 3);
        assert_eq!(config.polling.max_delay_ms, 60_000);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.polling.max_attempts = 0;
        assert!(matches!(config.validate(), Err(CoreError::Configuration(_))));

        let mut config = AppConfig::default();
        config.polling.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.defaults.default_quantity = "one".to_string();
        assert!(config.validate().is_err());
    }
}
