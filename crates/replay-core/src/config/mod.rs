//! Configuration for replay desk applications
//!
//! This module provides:
//!
//! - Generic YAML config loading/saving
//! - Standard config file locations
//! - [`ClientConfig`], the server connection settings
//!
//! # Usage
//!
//! ```ignore
//! use replay_core::config::{load_config, default_config_path, ClientConfig};
//!
//! let config: ClientConfig = load_config(&default_config_path("config.yaml"));
//! ```

mod client;
mod io;
mod paths;

pub use client::ClientConfig;
pub use io::{load_config, read_config, save_config};
pub use paths::{default_config_dir, default_config_path};
