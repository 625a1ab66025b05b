//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file does not exist: {path}")]
    FileNotFound { path: PathBuf },

    /// The config file exists but could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or does not match the schema.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// An environment override holds a value of the wrong shape.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidEnvValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Device selector is not one of the supported devices.
    #[error("{domain}.device must be one of [cpu, cuda], got '{value}'")]
    InvalidDevice { domain: &'static str, value: String },

    /// A model entry has an empty name.
    #[error("{domain}.models contains an entry with an empty name")]
    EmptyModelName { domain: &'static str },

    /// A model entry has an empty backing identifier.
    #[error("{domain}.models entry '{name}' has an empty path")]
    EmptyModelPath { domain: &'static str, name: String },

    /// Two model entries of one domain share a name.
    #[error("{domain}.models declares '{name}' more than once")]
    DuplicateModel { domain: &'static str, name: String },
}
