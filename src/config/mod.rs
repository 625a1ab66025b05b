//! File + environment configuration.
//!
//! Settings come from a TOML file (see [`Config::load`]); a handful of
//! `VECRANK_*` environment variables override individual values on top of it.
//! Every setting has a default, so a missing default-location file is not an
//! error.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [embedding]
//! device = "cuda"
//! [[embedding.models]]
//! name = "bge-base"
//! path = "/models/bge-base-en-v1.5"
//!
//! [auth]
//! enabled = true
//! keys = ["secret-token"]
//! ```

pub mod error;
pub mod model;


pub use error::ConfigError;
pub use model::{Domain, DomainConfig, ModelSpec};

use std::collections::HashSet;
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::{DEFAULT_LOG_BUFFERED_LINES, DEFAULT_PORT, ENV_DEVICE_OVERRIDE};
use crate::embedding::{DeviceKind, RuntimeSettings};

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub embedding: DomainConfig,
    pub rerank: DomainConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// IP address to bind to. Default: `127.0.0.1`.
    pub host: IpAddr,
    /// HTTP port. Default: `8080`.
    pub port: u16,
    /// Build every engine before the listener binds. Default: `false`.
    pub warmup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            warmup: false,
        }
    }
}

impl ServerConfig {
    /// Returns `"{host}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        match self.host {
            IpAddr::V6(addr) => format!("[{}]:{}", addr, self.port),
            IpAddr::V4(addr) => format!("{}:{}", addr, self.port),
        }
    }
}

/// Bearer-token gate settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub enabled: bool,
    /// Accepted tokens. Entries are trimmed; blank entries are dropped.
    pub keys: HashSet<String>,
}

impl AuthConfig {
    fn normalized(self) -> Self {
        let keys = self
            .keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            enabled: self.enabled,
            keys,
        }
    }
}

/// Log line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Console stream used when no log file is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    #[default]
    Stdout,
    Stderr,
}

/// Logging settings (consumed by [`crate::telemetry`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive. `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
    pub stream: LogStream,
    /// Append to this file instead of writing to `stream`.
    pub file: Option<PathBuf>,
    /// Capacity of the bounded channel between producers and the log writer.
    pub buffered_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            stream: LogStream::Stdout,
            file: None,
            buffered_lines: DEFAULT_LOG_BUFFERED_LINES,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    server: ServerConfig,
    embedding: DomainSection,
    rerank: DomainSection,
    auth: AuthConfig,
    logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DomainSection {
    device: Option<String>,
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelEntry {
    name: String,
    path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: DomainConfig {
                domain: Domain::Embedding,
                models: Vec::new(),
                runtime: RuntimeSettings::new(DeviceKind::Cpu),
            },
            rerank: DomainConfig {
                domain: Domain::Rerank,
                models: Vec::new(),
                runtime: RuntimeSettings::new(DeviceKind::Cpu),
            },
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub const ENV_CONFIG_PATH: &'static str = "VECRANK_CONFIG";
    pub const ENV_PROFILE: &'static str = "VECRANK_ENV";
    const ENV_HOST: &'static str = "VECRANK_HOST";
    const ENV_PORT: &'static str = "VECRANK_PORT";
    const ENV_WARMUP: &'static str = "VECRANK_WARMUP";
    const ENV_LOG_LEVEL: &'static str = "VECRANK_LOG";
    const ENV_LOG_FORMAT: &'static str = "VECRANK_LOG_FORMAT";
    const ENV_AUTH_ENABLED: &'static str = "VECRANK_AUTH_ENABLED";
    const ENV_AUTH_KEYS: &'static str = "VECRANK_AUTH_KEYS";

    /// Loads the config file, then applies environment overrides and validates.
    ///
    /// The file is `$VECRANK_CONFIG` when set (and must exist), otherwise
    /// `config/config.{$VECRANK_ENV or "dev"}.toml` if present.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match env::var(Self::ENV_CONFIG_PATH) {
            Ok(path) => Some(ConfigFile::read(Path::new(&path))?),
            Err(_) => {
                let path = Self::default_path();
                if path.is_file() {
                    Some(ConfigFile::read(&path)?)
                } else {
                    None
                }
            }
        };

        let device_override = Self::parse_optional_string_from_env(ENV_DEVICE_OVERRIDE);
        let mut config = Self::resolve(file.unwrap_or_default(), device_override.as_deref())?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source: Box::new(e),
        })?;
        let config = Self::resolve(file, None)?;
        config.validate()?;
        Ok(config)
    }

    /// `config/config.{profile}.toml`, relative to the working directory.
    pub fn default_path() -> PathBuf {
        let profile = env::var(Self::ENV_PROFILE)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "dev".to_string());
        PathBuf::from("config").join(format!("config.{profile}.toml"))
    }

    /// Validates cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort {
                value: self.server.port.to_string(),
            });
        }

        for domain in [&self.embedding, &self.rerank] {
            let label = domain.domain.as_str();
            let mut seen = HashSet::new();
            for model in &domain.models {
                if model.name.trim().is_empty() {
                    return Err(ConfigError::EmptyModelName { domain: label });
                }
                if model.path.trim().is_empty() {
                    return Err(ConfigError::EmptyModelPath {
                        domain: label,
                        name: model.name.clone(),
                    });
                }
                if !seen.insert(model.name.as_str()) {
                    return Err(ConfigError::DuplicateModel {
                        domain: label,
                        name: model.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn resolve(file: ConfigFile, device_override: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            server: file.server,
            embedding: Self::resolve_domain(Domain::Embedding, file.embedding, device_override)?,
            rerank: Self::resolve_domain(Domain::Rerank, file.rerank, device_override)?,
            auth: file.auth.normalized(),
            logging: file.logging,
        })
    }

    fn resolve_domain(
        domain: Domain,
        section: DomainSection,
        device_override: Option<&str>,
    ) -> Result<DomainConfig, ConfigError> {
        let device = resolve_device(domain, device_override, section.device.as_deref())?;
        let models = section
            .models
            .into_iter()
            .map(|entry| ModelSpec::new(domain, entry.name, entry.path))
            .collect();

        Ok(DomainConfig {
            domain,
            models,
            runtime: RuntimeSettings::new(device),
        })
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = Self::parse_optional_string_from_env(Self::ENV_HOST) {
            self.server.host = host
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr {
                    value: host.clone(),
                    source: e,
                })?;
        }

        if let Some(port) = Self::parse_optional_string_from_env(Self::ENV_PORT) {
            self.server.port = Self::parse_port(port)?;
        }

        if let Some(warmup) = Self::parse_bool_from_env(Self::ENV_WARMUP)? {
            self.server.warmup = warmup;
        }

        if let Some(enabled) = Self::parse_bool_from_env(Self::ENV_AUTH_ENABLED)? {
            self.auth.enabled = enabled;
        }

        if let Some(keys) = Self::parse_optional_string_from_env(Self::ENV_AUTH_KEYS) {
            self.auth = AuthConfig {
                enabled: self.auth.enabled,
                keys: keys.split(',').map(str::to_string).collect(),
            }
            .normalized();
        }

        if let Some(level) = Self::parse_optional_string_from_env(Self::ENV_LOG_LEVEL) {
            self.logging.level = level;
        }

        if let Some(format) = Self::parse_optional_string_from_env(Self::ENV_LOG_FORMAT) {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidEnvValue {
                        name: Self::ENV_LOG_FORMAT,
                        value: format,
                        reason: "expected 'text' or 'json'",
                    });
                }
            };
        }

        Ok(())
    }

    fn parse_port(value: String) -> Result<u16, ConfigError> {
        let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
            value: value.clone(),
            source: e,
        })?;

        if port == 0 {
            return Err(ConfigError::InvalidPort { value });
        }

        Ok(port)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_bool_from_env(var_name: &'static str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = Self::parse_optional_string_from_env(var_name) else {
            return Ok(None);
        };

        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvValue {
                name: var_name,
                value,
                reason: "expected a boolean",
            }),
        }
    }
}

impl ConfigFile {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }
}

/// Resolves a domain's device: override, else configured value, else CPU.
pub fn resolve_device(
    domain: Domain,
    device_override: Option<&str>,
    configured: Option<&str>,
) -> Result<DeviceKind, ConfigError> {
    let raw = device_override
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| configured.map(str::trim).filter(|v| !v.is_empty()));

    match raw {
        None => Ok(DeviceKind::Cpu),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidDevice {
            domain: domain.as_str(),
            value: value.to_string(),
        }),
    }
}
