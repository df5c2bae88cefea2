//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via WIDEROW_CONFIG or --config)
//! 3. Environment variables

use crate::connection::{ConnectionConfig, DEFAULT_READ_BUFFER_SIZE};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use widerow_protocol::{table_name, DEFAULT_PORT};

/// Client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server endpoint.
    pub endpoint: EndpointConfig,
    /// Table naming.
    pub table: TableConfig,
    /// Read defaults.
    pub read: ReadConfig,
}

impl ClientConfig {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("WIDEROW_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.endpoint.apply_env_overrides();
        self.table.apply_env_overrides();
        self.read.apply_env_overrides();
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))
    }

    /// Connection settings derived from the endpoint section.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.endpoint.addr)
            .with_connect_timeout(self.endpoint.connect_timeout())
            .with_read_timeout(self.endpoint.read_timeout())
            .with_read_buffer_size(self.endpoint.read_buffer_size)
    }

    /// Fully qualified name of `table_id` in the configured instance.
    pub fn table_name(&self, table_id: &str) -> String {
        table_name(&self.table.project, &self.table.instance, table_id)
    }
}

/// Server endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Server address.
    #[serde(with = "socket_addr_serde")]
    pub addr: SocketAddr,
    pub connect_timeout_secs: u64,
    /// Maximum wait for each read from the socket.
    pub read_timeout_secs: u64,
    /// Socket read buffer size, clamped to 1 KiB..1 MiB.
    pub read_buffer_size: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl EndpointConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("WIDEROW_ADDR") {
            if let Ok(parsed) = addr.parse() {
                self.addr = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("WIDEROW_CONNECT_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.connect_timeout_secs = secs;
            }
        }

        if let Ok(timeout) = std::env::var("WIDEROW_READ_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.read_timeout_secs = secs;
            }
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Table naming configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub project: String,
    pub instance: String,
    /// App profile sent with every read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_profile: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            project: "default".to_string(),
            instance: "default".to_string(),
            app_profile: None,
        }
    }
}

impl TableConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(project) = std::env::var("WIDEROW_PROJECT") {
            self.project = project;
        }
        if let Ok(instance) = std::env::var("WIDEROW_INSTANCE") {
            self.instance = instance;
        }
        if let Ok(profile) = std::env::var("WIDEROW_APP_PROFILE") {
            self.app_profile = Some(profile).filter(|p| !p.is_empty());
        }
    }
}

/// Read defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Default row limit for reads, 0 for unlimited.
    pub rows_limit: u64,
}

impl ReadConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(limit) = std::env::var("WIDEROW_ROWS_LIMIT") {
            if let Ok(n) = limit.parse() {
                self.rows_limit = n;
            }
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serializes `SocketAddr` as a string in YAML.
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S: Serializer>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SocketAddr, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
