//! Configuration loading for Scriptorium.
//! Reads scriptorium.toml from the current directory or the path in SCRIPTORIUM_CONFIG.

use serde::{Deserialize, Serialize};
use std::path::Path;

use scriptorium_ingestion::IngestionConfig;

pub const CONFIG_ENV_VAR: &str = "SCRIPTORIUM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "scriptorium.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_routing_key")]
    pub routing_key: String,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_exchange()         -> String { "data_collected".to_string() }
fn default_routing_key()      -> String { "data.collected".to_string() }
fn default_channel_capacity() -> usize  { 256 }

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
            routing_key: default_routing_key(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Upper bound on collections returned by a listing.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_list_limit() -> usize { 100 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { list_limit: default_list_limit() }
    }
}

impl Config {
    /// Load configuration from scriptorium.toml.
    /// Checks SCRIPTORIUM_CONFIG first, then the current directory. A missing
    /// file yields the defaults; a malformed one is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                "Config file not found: {}. Using defaults; copy scriptorium.example.toml to change them.",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
