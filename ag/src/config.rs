//! Agent configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How workers reach the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Http,
    Rpc,
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "rpc" => Ok(Self::Rpc),
            _ => Err(format!("Unknown transport: {}. Use: http or rpc", s)),
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Rpc => write!(f, "rpc"),
        }
    }
}

/// Main agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub transport: Transport,

    /// Orchestrator base URL for the HTTP transport
    #[serde(rename = "http-url")]
    pub http_url: String,

    /// Orchestrator RPC address
    #[serde(rename = "rpc-addr")]
    pub rpc_addr: String,

    /// Per-request timeout
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Number of concurrent workers
    #[serde(rename = "computing-power")]
    pub computing_power: usize,

    /// Idle sleep after an empty pull
    #[serde(rename = "poll-backoff-ms")]
    pub poll_backoff_ms: u64,

    /// Attempts per result submission
    #[serde(rename = "submit-retries")]
    pub submit_retries: u32,

    /// Base delay between submission attempts; attempt n waits n times this
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Http,
            http_url: "http://localhost:8080".to_string(),
            rpc_addr: "localhost:8082".to_string(),
            timeout_ms: 5000,
            computing_power: 2,
            poll_backoff_ms: 1000,
            submit_retries: 3,
            retry_backoff_ms: 200,
        }
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_backoff(&self) -> Duration {
        Duration::from_millis(self.poll_backoff_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.computing_power == 0 {
            return Err(eyre::eyre!("computing-power must be greater than zero"));
        }
        if self.submit_retries == 0 {
            return Err(eyre::eyre!("submit-retries must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(eyre::eyre!("timeout-ms must be greater than zero"));
        }
        match self.transport {
            Transport::Http if self.http_url.trim().is_empty() => Err(eyre::eyre!("http-url must be set")),
            Transport::Rpc if self.rpc_addr.trim().is_empty() => Err(eyre::eyre!("rpc-addr must be set")),
            _ => Ok(()),
        }
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .calcagent.yml
        let local_config = PathBuf::from(".calcagent.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/calcagent/calcagent.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("calcagent").join("calcagent.yml");
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

    /// Apply `COMPUTING_POWER` and `ORCHESTRATOR_URL` from `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("COMPUTING_POWER") {
            self.computing_power = value
                .trim()
                .parse()
                .context(format!("Invalid COMPUTING_POWER: {}", value))?;
        }
        if let Some(value) = lookup("ORCHESTRATOR_URL") {
            self.http_url = value.trim().to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();

        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.computing_power, 2);
        assert_eq!(config.poll_backoff(), Duration::from_secs(1));
        assert_eq!(config.submit_retries, 3);
        assert_eq!(config.retry_backoff(), Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
transport: rpc
rpc-addr: 10.0.0.5:8082
computing-power: 8
poll-backoff-ms: 250
"#;

        let config: AgentConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.transport, Transport::Rpc);
        assert_eq!(config.rpc_addr, "10.0.0.5:8082");
        assert_eq!(config.computing_power, 8);
        assert_eq!(config.poll_backoff_ms, 250);
        assert_eq!(config.submit_retries, 3);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = AgentConfig {
            computing_power: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let config = AgentConfig {
            submit_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("RPC".parse::<Transport>().unwrap(), Transport::Rpc);
        assert_eq!("http".parse::<Transport>().unwrap(), Transport::Http);
        assert!("grpc".parse::<Transport>().is_err());
        assert_eq!(Transport::Rpc.to_string(), "rpc");
    }

    #[test]
    fn test_apply_env_from() {
        let mut config = AgentConfig::default();
        config
            .apply_env_from(|key| match key {
                "COMPUTING_POWER" => Some("6".to_string()),
                "ORCHESTRATOR_URL" => Some("http://coordinator:9000".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.computing_power, 6);
        assert_eq!(config.http_url, "http://coordinator:9000");
    }

    #[test]
    fn test_apply_env_from_rejects_garbage() {
        let mut config = AgentConfig::default();
        let result = config.apply_env_from(|key| (key == "COMPUTING_POWER").then(|| "lots".to_string()));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_apply_env_reads_process_environment() {
        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::set_var("COMPUTING_POWER", "5") };
        let mut config = AgentConfig::default();
        let result = config.apply_env();
        unsafe { std::env::remove_var("COMPUTING_POWER") };

        result.unwrap();
        assert_eq!(config.computing_power, 5);
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("calcagent.yml");
        fs::write(&path, "computing-power: 3\n").unwrap();

        let config = AgentConfig::load(Some(&path)).unwrap();
        assert_eq!(config.computing_power, 3);
    }
}
