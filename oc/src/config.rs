//! Orchestrator configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coordinator::CoordinatorConfig;
use crate::store::RetryPolicy;

/// Main orchestrator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen addresses
    pub server: ServerConfig,

    /// Queue size, operation delays and task timeout
    pub coordinator: CoordinatorConfig,

    /// Expression storage
    pub persistence: PersistenceConfig,

    /// Bearer token table
    pub auth: AuthConfig,

    /// Defaults for the client subcommands
    pub client: ClientConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.coordinator.queue_capacity == 0 {
            return Err(eyre::eyre!("coordinator.queue-capacity must be greater than zero"));
        }
        let timings = &self.coordinator.timings;
        for (name, value) in [
            ("addition-ms", timings.addition_ms),
            ("subtraction-ms", timings.subtraction_ms),
            ("multiplication-ms", timings.multiplication_ms),
            ("division-ms", timings.division_ms),
        ] {
            if value < 0 {
                return Err(eyre::eyre!("coordinator.timings.{} must not be negative", name));
            }
        }
        if self.persistence.retry_attempts == 0 {
            return Err(eyre::eyre!("persistence.retry-attempts must be at least 1"));
        }
        self.server.http_socket_addr()?;
        self.server.rpc_socket_addr()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .orchestrator.yml
        let local_config = PathBuf::from(".orchestrator.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/orchestrator/orchestrator.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("orchestrator").join("orchestrator.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`
    ///
    /// Recognised keys: `TIME_ADDITION_MS`, `TIME_SUBTRACTION_MS`,
    /// `TIME_MULTIPLICATIONS_MS`, `TIME_DIVISIONS_MS` and `ORCHESTRATOR_PORT`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timings = &mut self.coordinator.timings;
        for (key, slot) in [
            ("TIME_ADDITION_MS", &mut timings.addition_ms),
            ("TIME_SUBTRACTION_MS", &mut timings.subtraction_ms),
            ("TIME_MULTIPLICATIONS_MS", &mut timings.multiplication_ms),
            ("TIME_DIVISIONS_MS", &mut timings.division_ms),
        ] {
            if let Some(value) = lookup(key) {
                *slot = value
                    .trim()
                    .parse()
                    .context(format!("Invalid {}: {}", key, value))?;
            }
        }

        if let Some(value) = lookup("ORCHESTRATOR_PORT") {
            let port: u16 = value
                .trim()
                .parse()
                .context(format!("Invalid ORCHESTRATOR_PORT: {}", value))?;
            let mut addr = self.server.http_socket_addr()?;
            addr.set_port(port);
            self.server.http_addr = addr.to_string();
        }
        Ok(())
    }
}

/// Listen addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP API address
    #[serde(rename = "http-addr")]
    pub http_addr: String,

    /// Worker RPC address
    #[serde(rename = "rpc-addr")]
    pub rpc_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            rpc_addr: "0.0.0.0:8082".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn http_socket_addr(&self) -> Result<SocketAddr> {
        self.http_addr
            .parse()
            .context(format!("Invalid server.http-addr: {}", self.http_addr))
    }

    pub fn rpc_socket_addr(&self) -> Result<SocketAddr> {
        self.rpc_addr
            .parse()
            .context(format!("Invalid server.rpc-addr: {}", self.rpc_addr))
    }
}

/// Storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    File,
}

/// Expression storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub backend: Backend,

    /// JSONL log path for the file backend
    pub path: PathBuf,

    /// Attempts per store call before giving up
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    /// Base delay between attempts; attempt n waits n times this
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/orchestrator on Linux)
        let path = dirs::data_local_dir()
            .map(|d| d.join("orchestrator"))
            .unwrap_or_else(|| PathBuf::from(".orchestrator"))
            .join("expressions.jsonl");

        Self {
            backend: Backend::Memory,
            path,
            retry_attempts: 3,
            retry_backoff_ms: 200,
        }
    }
}

impl PersistenceConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_backoff_ms))
    }
}

/// Bearer token table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token → owner id; empty means open mode
    pub tokens: HashMap<String, String>,
}

/// Defaults for the client subcommands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Orchestrator base URL
    pub url: String,

    /// Bearer token
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            token: None,
        }
    }
}
