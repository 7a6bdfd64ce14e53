//! Simulator Configuration

use activity_server::ServerConfig;
use anyhow::{anyhow, Result};
use npc_engine::ExcludedCharacter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Simulator configuration, loaded from TOML and overridden by flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// HTTP bind address
    pub http_addr: String,
    /// Directory holding the sled world store
    pub data_dir: PathBuf,
    /// Player character the simulation never drives
    pub excluded_character_name: String,
    pub excluded_character_id: String,
    /// Upper bound on turns per batch
    pub max_activity_count: usize,
    /// Run a batch every N seconds while serving (0 = only on request)
    pub tick_secs: u64,
    /// World document used to populate an empty store
    pub seed_file: Option<PathBuf>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        let excluded = ExcludedCharacter::default();
        Self {
            http_addr: server.http_addr,
            data_dir: PathBuf::from("./data"),
            excluded_character_name: excluded.name,
            excluded_character_id: excluded.id,
            max_activity_count: server.max_activity_count,
            tick_secs: 0,
            seed_file: None,
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;
        Self::from_toml(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn excluded(&self) -> ExcludedCharacter {
        ExcludedCharacter {
            name: self.excluded_character_name.clone(),
            id: self.excluded_character_id.clone(),
        }
    }

    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr.clone(),
            max_activity_count: self.max_activity_count,
        }
    }
}
