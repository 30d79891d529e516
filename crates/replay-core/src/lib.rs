//! Replay Core - Shared library for the race replay desk
//!
//! Lists recorded race replays, edits their labels and comments, and sends
//! playback commands to the replay server, keeping the client's view of the
//! collection consistent with the server across asynchronous requests.

pub mod config;
pub mod controller;
pub mod resource;
pub mod services;
pub mod store;
pub mod text;
pub mod types;

#[cfg(test)]
mod testing;

pub use controller::{ControllerError, ControllerResult, Lifecycle, ReplayController, ReplayEvent};
pub use store::{ReplayListStore, Snapshot};
pub use types::*;
