// RUNTIME PREFERENCES

use super::constants::{host, refresh, template};
use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }

    pub fn to_events_log_level(self) -> crate::logging::LogLevel {
        match self {
            Self::Error => crate::logging::LogLevel::Error,
            Self::Warning => crate::logging::LogLevel::Warning,
            Self::Info => crate::logging::LogLevel::Info,
            Self::Debug => crate::logging::LogLevel::Debug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Coalescing window for view refreshes after derived fields arrive
    pub refresh_delay_ms: u64,

    /// Nesting limit enforced when a column template is registered
    pub max_template_depth: usize,

    /// Minimum level forwarded by the logging service
    pub min_log_level: LogLevel,

    /// Emit JSON lines instead of plain log lines
    pub structured_logging: bool,

    /// Host version string used to resolve host capabilities once at startup
    pub host_version: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            refresh_delay_ms: env::var("COLUMNS_REFRESH_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(refresh::DEFAULT_REFRESH_DELAY_MS),
            max_template_depth: env::var("COLUMNS_MAX_TEMPLATE_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(template::DEFAULT_MAX_TEMPLATE_DEPTH),
            min_log_level: env::var("COLUMNS_LOG_LEVEL")
                .ok()
                .and_then(|v| LogLevel::parse(&v))
                .unwrap_or(LogLevel::Warning),
            structured_logging: env::var("COLUMNS_STRUCTURED_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            host_version: env::var("COLUMNS_HOST_VERSION")
                .unwrap_or_else(|_| host::DEFAULT_HOST_VERSION.to_string()),
        }
    }
}

impl RuntimeConfig {
    /// Parse preferences from TOML; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "refresh_delay_ms",
                reason: "refresh delay must be at least 1ms".to_string(),
            });
        }

        if self.max_template_depth == 0 || self.max_template_depth > template::MAX_TEMPLATE_DEPTH
        {
            return Err(ConfigError::InvalidValue {
                key: "max_template_depth",
                reason: format!(
                    "must be between 1 and {}",
                    template::MAX_TEMPLATE_DEPTH
                ),
            });
        }

        Ok(())
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}
