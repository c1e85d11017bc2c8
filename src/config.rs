use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level engine configuration, usually read from `scopeflow.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub custom_code: CustomCodeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Controls the `CUSTOM_CODE` capability of the condition evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCodeConfig {
    /// When false every custom-code leaf evaluates to `false`.
    #[serde(default = "default_custom_code_enabled")]
    pub enabled: bool,
    /// Used when a leaf does not carry its own `timeoutMs`.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Upper bound applied to every leaf timeout.
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
    /// Languages the host is willing to run. Empty means "whatever the runner supports".
    #[serde(default)]
    pub languages: Vec<String>,
}

impl Default for CustomCodeConfig {
    fn default() -> Self {
        Self {
            enabled: default_custom_code_enabled(),
            default_timeout_ms: default_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
            languages: Vec::new(),
        }
    }
}

impl CustomCodeConfig {
    /// Effective time budget for a leaf: its own `timeoutMs` (or the default),
    /// clamped to the configured maximum. A zero request falls back to the default.
    pub fn timeout_for(&self, requested_ms: Option<u64>) -> Duration {
        let ms = requested_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(self.default_timeout_ms)
            .min(self.max_timeout_ms);
        Duration::from_millis(ms)
    }

    pub fn allows_language(&self, language: &str) -> bool {
        self.languages.is_empty()
            || self
                .languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(language))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_custom_code_enabled() -> bool {
    true
}
fn default_timeout_ms() -> u64 {
    1000
}
fn default_max_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Parses a configuration document and checks its values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let cc = &self.custom_code;
        if cc.max_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "custom_code.max_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if cc.default_timeout_ms > cc.max_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "custom_code.default_timeout_ms ({}) exceeds max_timeout_ms ({})",
                cc.default_timeout_ms, cc.max_timeout_ms
            )));
        }
        Ok(())
    }
}
