//! Background services for replay-core
//!
//! Network requests run on background worker threads so the controller
//! thread stays responsive. The controller owns all state; services only
//! carry requests out and report back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  RemoteCommand   ┌───────────────────┐
//! │ ReplayController │ ───────────────► │ RemoteService     │
//! │  (event loop)    │                  │ (worker pool)     │
//! └──────────────────┘                  └───────────────────┘
//!          ▲                                     │
//!          │          Completion (arrival order) │
//!          └─────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use replay_core::resource::HttpReplayApi;
//! use replay_core::services::{RemoteClient, RemoteRequest, RemoteService};
//!
//! let api = Arc::new(HttpReplayApi::new("http://localhost:8080", Duration::from_secs(5)));
//! let (handle, completions) = RemoteService::spawn(api.clone(), api, 4).unwrap();
//! let client = RemoteClient::new(&handle);
//!
//! client.execute(1, RemoteRequest::QueryAll).unwrap();
//! let completion = completions.recv().unwrap();
//! println!("#{} finished: {:?}", completion.id, completion.result.is_ok());
//!
//! client.shutdown().unwrap();
//! handle.join();
//! ```

pub mod messages;
pub mod remote;

pub use messages::{
    Completion, RemoteCommand, RemoteReply, RemoteRequest, RequestId, RequestSink, ServiceHandle,
};
pub use remote::{RemoteClient, RemoteService};
