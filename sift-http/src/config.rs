//! Connection pool configuration
//!
//! Default config location: ~/.sift/config.toml
//!
//! ```toml
//! [pools.default]
//! hosts = ["http://127.0.0.1:9200"]
//! max_connections = 64
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use sift::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POOL: &str = sift::index::DEFAULT_POOL;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub pools: BTreeMap<String, PoolConfig>,
}

/// One named connection pool
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Base URLs, used round-robin
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Idle connections kept per host
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn default_hosts() -> Vec<String> {
    vec!["http://127.0.0.1:9200".to_string()]
}

fn default_max_connections() -> usize {
    64
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            max_connections: default_max_connections(),
            timeout_secs: default_timeout_secs(),
            username: None,
            password: None,
        }
    }
}

impl PoolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut pools = BTreeMap::new();
        pools.insert(DEFAULT_POOL.to_string(), PoolConfig::default());
        Self { pools }
    }
}

/// Default config path (~/.sift/config.toml)
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sift")
        .join("config.toml")
}

impl ClientConfig {
    /// Load and validate a config file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigurationMissing(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load `path` if given, else the default location if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    tracing::debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ClientConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pools.is_empty() {
            return Err(Error::ConfigurationMissing("[pools] section".to_string()));
        }
        for (name, pool) in &self.pools {
            if pool.hosts.is_empty() {
                return Err(Error::ConfigurationMissing(format!("pools.{}.hosts", name)));
            }
            for host in &pool.hosts {
                reqwest::Url::parse(host).map_err(|e| {
                    Error::Config(format!("pools.{}: invalid host '{}': {}", name, host, e))
                })?;
            }
            if pool.password.is_some() && pool.username.is_none() {
                return Err(Error::Config(format!(
                    "pools.{}: password given without username",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn pool(&self, name: &str) -> Result<&PoolConfig> {
        self.pools
            .get(name)
            .ok_or_else(|| Error::ClientResolution(format!("no connection pool named '{}'", name)))
    }
}
