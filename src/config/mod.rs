//! Configuration module
//!
//! Handles simulator settings: mode selection, device pattern and per-slot
//! electrical parameters.

mod settings;

pub use settings::{ConfigError, LoadedConfig, ModeConfig, SimConfig};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Configuration file name looked up in the working and config directories
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "serial-sim", "SerialSim").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Places searched for a configuration file, in order
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    paths
}
