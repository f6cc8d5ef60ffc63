//! Configuration module for the column crates
//!
//! Compile-time limits live in [`constants`]; user preferences that may be
//! changed through the environment or a TOML file live in [`runtime`].

pub mod constants;
pub mod runtime;

pub use runtime::{LogLevel, RuntimeConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
