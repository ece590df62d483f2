//! Configuration for the `mq` CLI driver.
//!
//! Defaults for the run subcommand can be saved to and loaded from a TOML
//! file, so repeated runs don't need every flag spelled out on the command
//! line.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Persisted defaults for the `run` subcommand.
#[derive(Debug, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default client (worker) count.
    pub client_count: Option<u32>,

    /// Default number of driver loop iterations.
    pub loops: Option<u64>,

    /// Default size of each client's and the shared driver's node pool.
    pub msg_count: Option<u32>,

    /// Default number of peer connections per client.
    pub peers: Option<u32>,

    /// Default logging level.
    pub log_level: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            client_count: Some(4),
            loops: Some(1000),
            msg_count: Some(64),
            peers: Some(0),
            log_level: Some("info".to_string()),
        }
    }
}

impl CliConfig {
    /// Load configuration from `path`, falling back to defaults if the
    /// file does not exist.
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`, creating parent directories as
    /// needed.
    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// The default configuration file path: `$XDG_CONFIG_HOME/mq/config.toml`
    /// (or platform equivalent).
    pub fn default_config_path() -> CliResult<std::path::PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("could not determine config directory"))?;
        Ok(config_dir.join("mq").join("config.toml"))
    }
}
