use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{NearCliError, Result};

pub const DEFAULT_NETWORK: &str = "testnet";
pub const CONFIG_DIR: &str = ".near-config";
pub const CREDENTIALS_DIR: &str = ".near-credentials";

/// Connection settings for one network.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NetworkConfig {
    pub network_id: String,
    pub node_url: String,
}

impl NetworkConfig {
    /// Built-in settings for the well-known networks.
    pub fn preset(network_id: &str) -> Option<Self> {
        let node_url = match network_id {
            "mainnet" | "production" => "https://rpc.mainnet.near.org",
            "testnet" | "development" => "https://rpc.testnet.near.org",
            "betanet" => "https://rpc.betanet.near.org",
            "local" => "http://localhost:3030",
            _ => return None,
        };
        let network_id = match network_id {
            "production" => "mainnet",
            "development" => "testnet",
            other => other,
        };
        Some(Self {
            network_id: network_id.to_string(),
            node_url: node_url.to_string(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_telemetry_endpoint")]
    pub endpoint: String,
}

fn default_telemetry_endpoint() -> String {
    "https://api.mixpanel.com/track".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { enabled: false, endpoint: default_telemetry_endpoint() }
    }
}

/// Contents of `~/.near-config/config.toml`. Every section is optional.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CliConfig {
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Per-network overrides, keyed by network id
    #[serde(default)]
    pub networks: HashMap<String, NetworkConfig>,
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            key_path: None,
            rpc_timeout_secs: default_rpc_timeout_secs(),
            telemetry: TelemetryConfig::default(),
            networks: HashMap::new(),
        }
    }
}

impl CliConfig {
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at '{}'. Using defaults.", path.display());
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&s)
            .map_err(|e| NearCliError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Config loaded from {}", path.display());
        Ok(config)
    }

    pub fn network(&self, network_id: &str) -> Result<NetworkConfig> {
        if let Some(network) = self.networks.get(network_id) {
            return Ok(network.clone());
        }
        NetworkConfig::preset(network_id)
            .ok_or_else(|| NearCliError::Config(format!("Unknown network '{}' and no [networks.{}] section", network_id, network_id)))
    }
}

pub fn home_dir() -> Result<PathBuf> {
    dirs_next::home_dir().ok_or_else(|| NearCliError::Config("Cannot determine home directory".to_string()))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(CONFIG_DIR).join("config.toml"))
}

pub fn default_key_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(CREDENTIALS_DIR))
}

/// Flags and environment that override the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub network_id: Option<String>,
    pub node_url: Option<String>,
    pub key_path: Option<PathBuf>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub network: NetworkConfig,
    pub key_path: PathBuf,
    pub rpc_timeout_secs: u64,
    pub telemetry: TelemetryConfig,
}

impl ResolvedConfig {
    pub fn resolve(config: &CliConfig, overrides: Overrides) -> Result<Self> {
        let network_id = overrides.network_id.unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        let mut network = config.network(&network_id)?;
        if let Some(node_url) = overrides.node_url {
            network.node_url = node_url;
        }

        let key_path = match overrides.key_path.or_else(|| config.key_path.clone()) {
            Some(p) => p,
            None => default_key_path()?,
        };

        Ok(Self {
            network,
            key_path,
            rpc_timeout_secs: config.rpc_timeout_secs,
            telemetry: config.telemetry.clone(),
        })
    }
}
