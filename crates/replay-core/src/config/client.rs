//! Server connection settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the replay server
///
/// Unknown or missing fields fall back to their defaults so older config
/// files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server root, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of remote worker threads
    pub workers: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 5000,
            workers: 4,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Worker count, never zero
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: ClientConfig = serde_yaml::from_str("base_url: http://pilot:9000\n").unwrap();
        assert_eq!(config.base_url, "http://pilot:9000");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_worker_count_never_zero() {
        let config = ClientConfig {
            workers: 0,
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }
}
