//! Gateway configuration, read from a TOML file.
//!
//! Every section and every field is optional:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 9092
//! admin_host = "127.0.0.1"
//! admin_port = 9093
//!
//! [schema_source]
//! url = "https://servicedesk.example/api/module/request/form"
//! timeout_ms = 5000
//!
//! [cache]
//! schema_ttl_secs = 300
//! capability_ttl_secs = 300
//!
//! [capability]
//! name = "create_request"
//!
//! [router]
//! unknown_arguments = "ignore"
//! ```

use crate::error::ConfigError;
use crate::router::UnknownArgumentPolicy;
use capgate_model::{DEFAULT_CAPABILITY_DESCRIPTION, DEFAULT_CAPABILITY_NAME};
use capgate_source::SchemaSourceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub schema_source: SchemaSourceConfig,
    pub cache: CacheConfig,
    pub capability: CapabilityConfig,
    pub router: RouterConfig,
}

impl GatewayConfig {
    /// Loads configuration from `path`. A missing file yields the defaults;
    /// a file that exists but cannot be read or parsed is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}

/// Listener addresses. The cache admin endpoints get their own listener so
/// they can stay on loopback while the capability API is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub admin_host: String,
    pub admin_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9092,
            admin_host: "127.0.0.1".to_string(),
            admin_port: 9093,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn admin_bind_addr(&self) -> String {
        format!("{}:{}", self.admin_host, self.admin_port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub schema_ttl_secs: u64,
    pub capability_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            schema_ttl_secs: 300,
            capability_ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn schema_ttl(&self) -> Duration {
        Duration::from_secs(self.schema_ttl_secs)
    }

    pub fn capability_ttl(&self) -> Duration {
        Duration::from_secs(self.capability_ttl_secs)
    }
}

/// Name and description of the per-identity capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub name: String,
    pub description: String,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CAPABILITY_NAME.to_string(),
            description: DEFAULT_CAPABILITY_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub unknown_arguments: UnknownArgumentPolicy,
}
