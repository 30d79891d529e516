//! Remote replay resources
//!
//! Two narrow traits describe what the desk needs from the server:
//!
//! - [`ReplayResource`] - list, play and stop replays
//! - [`ReplayMetadataService`] - replace a replay's labels, append comments
//!
//! Both are blocking and `Send + Sync`; they are called from the
//! [`RemoteService`](crate::services::RemoteService) worker threads, never
//! from the controller thread. [`HttpReplayApi`] implements both against
//! the REST API.

pub mod http;

use crate::types::{CommentDraft, Replay, ReplayTag, TagRef};
use thiserror::Error;

pub use http::HttpReplayApi;

/// Errors that can occur while talking to the replay server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Connection, DNS, TLS or I/O failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("Server rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Reply variant did not match the request that produced it
    #[error("Unexpected reply for {0} request")]
    UnexpectedReply(&'static str),

    /// Remote service is not running
    #[error("Remote service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

/// Result type for remote operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Accessor for the replay collection
pub trait ReplayResource: Send + Sync {
    /// Fetch the full collection in server order
    fn query(&self) -> ApiResult<Vec<Replay>>;

    /// Fetch one replay; the server starts playing it as a side effect
    ///
    /// Returns `None` when the server acknowledges without a replay document.
    fn get(&self, tag: &ReplayTag) -> ApiResult<Option<Replay>>;

    /// Stop playback. The protocol only honours [`ReplayTag::all`].
    fn stop(&self, tag: &ReplayTag) -> ApiResult<()>;
}

/// Metadata operations scoped to one replay
pub trait ReplayMetadataService: Send + Sync {
    /// Replace the replay's whole label list
    fn update_tags(&self, tag: &ReplayTag, tags: &[TagRef]) -> ApiResult<()>;

    /// Append a comment
    fn save_comment(&self, tag: &ReplayTag, comment: &CommentDraft) -> ApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Rejected {
            status: 422,
            body: "bad tag".to_string(),
        };
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("bad tag"));

        let err: ApiError = serde_json::from_str::<Replay>("nope").unwrap_err().into();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
