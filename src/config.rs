use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use log::*;
use serde::{Deserialize, Serialize};

use crate::voxels::block::block_type::BlockType;
use crate::voxels::codec::FileLayout;

/// Editor settings read from a JSON file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Threads the scan pipeline spreads chunks over.
    pub worker_count: usize,
    /// Layout used when saving; loading detects the layout of the input.
    pub layout: FileLayout,
    /// Type ids the scan pipeline looks for, in order.
    pub scan_block_types: Vec<u32>,
    /// Filter passed to the logger when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Config {
            worker_count,
            layout: FileLayout::CANONICAL,
            scan_block_types: BlockType::SOLID.iter().map(|t| t.type_id()).collect(),
            log_level: "info".to_owned(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Invalid config JSON: {}", e),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Reads the config at `path`. A missing file is created with the defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_or_create_config(path).map(|(config, _)| config)
}

/// Like [`load_config`], also returning `true` when the file had to be created.
pub fn load_or_create_config(path: &Path) -> Result<(Config, bool), ConfigError> {
    if path.exists() {
        let json = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&json)?;
        debug!("Loaded config from {}", path.display());
        Ok((config, false))
    } else {
        info!("Config file not found, creating {}", path.display());
        let config = Config::default();
        write_config(path, &config)?;
        Ok((config, true))
    }
}

/// Writes `config` to `path` as pretty JSON.
pub fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(config)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}
