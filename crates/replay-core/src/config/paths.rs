//! Path utilities for replay desk configuration files

use std::path::PathBuf;

/// Get the default configuration directory
///
/// Returns: `<platform config dir>/replay-desk`, falling back to
/// `./replay-desk` when the platform has no config dir.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("replay-desk")
}

/// Get the default config file path for a given file name
///
/// # Arguments
/// * `filename` - Config file name (e.g., "config.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
