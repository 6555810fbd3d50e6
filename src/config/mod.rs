//! Process configuration: defaults, then an optional YAML file, then
//! environment variables (with `.env` loaded first).
//!
//! Loaded once in `main`. Nothing under `core` reads it; the pieces it
//! describes are built here and handed down.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use dotenv::dotenv;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::InvalidValue {
            key: "server.host".to_string(),
            value: self.host.clone(),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("uri", &"<redacted>")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            uri: "mem://localhost".to_string(),
            name: "app".to_string(),
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive such as `info` or `userkeep=debug`. `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
    /// `stdout`, `stderr`, or a file path to append to.
    pub output: String,
    /// File output only: rotate once the current file passes this size.
    pub max_size_mb: u64,
    /// File output only: rotated backups to keep.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: "stdout".to_string(),
            max_size_mb: 100,
            max_files: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsConfig {
    pub bcrypt_cost: u32,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        CredentialsConfig {
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AppConfig {
    /// Full process load: `.env`, the file named by `CONFIG_PATH` (or
    /// `config.yaml` if present), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        let explicit = std::env::var(CONFIG_PATH_VAR).ok();
        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Overrides fields from `lookup`, which maps variable names to values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = parse_value("SERVER_PORT", &port)?;
        }
        if let Some(timeout) = lookup("REQUEST_TIMEOUT") {
            self.server.request_timeout = parse_duration("REQUEST_TIMEOUT", &timeout)?;
        }
        if let Some(uri) = lookup("DATABASE_URI") {
            self.database.uri = uri;
        }
        if let Some(name) = lookup("DATABASE_NAME") {
            self.database.name = name;
        }
        if let Some(username) = lookup("DATABASE_USER") {
            self.database.username = Some(username);
        }
        if let Some(password) = lookup("DATABASE_PASSWORD") {
            self.database.password = Some(password);
        }
        if let Some(timeout) = lookup("DATABASE_CONNECT_TIMEOUT") {
            self.database.connect_timeout = parse_duration("DATABASE_CONNECT_TIMEOUT", &timeout)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(invalid("LOG_FORMAT", &format)),
            };
        }
        if let Some(output) = lookup("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Some(size) = lookup("LOG_MAX_SIZE_MB") {
            self.logging.max_size_mb = parse_value("LOG_MAX_SIZE_MB", &size)?;
        }
        if let Some(files) = lookup("LOG_MAX_FILES") {
            self.logging.max_files = parse_value("LOG_MAX_FILES", &files)?;
        }
        if let Some(cost) = lookup("BCRYPT_COST") {
            self.credentials.bcrypt_cost = parse_value("BCRYPT_COST", &cost)?;
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|_| invalid(key, value))
}
