//! YAML configuration I/O
//!
//! Works with any serde configuration type. Loading is forgiving: a desk
//! with a broken config file still starts, on defaults.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;

/// Read and parse a YAML config file
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_config<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read config file: {:?}", path))
        }
    };

    let config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    Ok(Some(config))
}

/// Load a config file, falling back to defaults
///
/// A missing file is expected on first run; an unreadable or invalid one
/// is logged and ignored.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match read_config(path) {
        Ok(Some(config)) => {
            log::info!("Loaded config from {:?}", path);
            config
        }
        Ok(None) => {
            log::info!("No config at {:?}, using defaults", path);
            T::default()
        }
        Err(e) => {
            log::warn!("{:#}, using defaults", e);
            T::default()
        }
    }
}

/// Write a config file, creating parent directories as needed
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    #[test]
    fn test_missing_file_reads_as_none() {
        let config: Option<ClientConfig> =
            read_config(Path::new("/nonexistent/path/config.yaml")).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: ClientConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_error_but_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "workers: [not, a, number]").unwrap();

        let err = read_config::<ClientConfig>(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));

        let config: ClientConfig = load_config(&path);
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_roundtrip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = ClientConfig {
            base_url: "http://pilot:9000".to_string(),
            timeout_ms: 250,
            workers: 2,
        };

        save_config(&config, &path).unwrap();
        let loaded: ClientConfig = load_config(&path);

        assert_eq!(loaded, config);
    }
}
