//! Message types for service communication
//!
//! The controller never calls the network itself. It hands a
//! [`RemoteRequest`] tagged with a [`RequestId`] to a [`RequestSink`], and
//! later receives a [`Completion`] carrying the same id. Completions are
//! delivered in the order responses arrive, which need not match the order
//! requests were issued.

use crate::resource::{ApiError, ApiResult};
use crate::types::{CommentDraft, Replay, ReplayTag, TagRef};

/// Identifier correlating a request with its completion
pub type RequestId = u64;

// ============================================================================
// Remote Requests
// ============================================================================

/// One network operation against the replay server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    /// Fetch the whole collection
    QueryAll,

    /// Fetch one replay, starting its playback
    Play { tag: ReplayTag },

    /// Stop playback
    Stop { tag: ReplayTag },

    /// Append a comment to a replay
    SaveComment {
        tag: ReplayTag,
        comment: CommentDraft,
    },

    /// Replace a replay's whole label list
    UpdateTags { tag: ReplayTag, tags: Vec<TagRef> },
}

impl RemoteRequest {
    /// Short name for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QueryAll => "query",
            Self::Play { .. } => "play",
            Self::Stop { .. } => "stop",
            Self::SaveComment { .. } => "comment",
            Self::UpdateTags { .. } => "tags",
        }
    }
}

/// Successful response payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteReply {
    /// Full collection snapshot
    Replays(Vec<Replay>),
    /// Play acknowledgement, with the replay document when the server sent one
    Played(Option<Replay>),
    /// Operation accepted, no payload
    Done,
}

/// A finished request, delivered in arrival order
#[derive(Debug, Clone)]
pub struct Completion {
    pub id: RequestId,
    pub result: ApiResult<RemoteReply>,
}

impl Completion {
    pub fn ok(id: RequestId, reply: RemoteReply) -> Self {
        Self { id, result: Ok(reply) }
    }

    pub fn err(id: RequestId, error: ApiError) -> Self {
        Self { id, result: Err(error) }
    }
}

/// Where the controller sends its requests
///
/// Implementations must not block on the network; the outcome is reported
/// later as a [`Completion`] with the same id.
pub trait RequestSink {
    fn dispatch(&self, id: RequestId, request: RemoteRequest) -> ApiResult<()>;
}

// ============================================================================
// Service Commands
// ============================================================================

/// Commands sent to the RemoteService
pub enum RemoteCommand {
    /// Run a request and publish its [`Completion`] on the completion channel
    Execute {
        id: RequestId,
        request: RemoteRequest,
    },

    /// Run a request and answer on a dedicated oneshot channel
    Call {
        request: RemoteRequest,
        reply: tokio::sync::oneshot::Sender<ApiResult<RemoteReply>>,
    },

    /// Stop one worker
    Shutdown,
}

// ============================================================================
// Service Handle
// ============================================================================

/// Handle for communicating with a background service
pub struct ServiceHandle<Cmd> {
    /// Channel for sending commands to the service
    pub command_tx: crossbeam::channel::Sender<Cmd>,
    /// Worker thread handles
    pub thread_handles: Vec<std::thread::JoinHandle<()>>,
}

impl<Cmd> ServiceHandle<Cmd> {
    /// Number of worker threads the service was started with
    pub fn worker_count(&self) -> usize {
        self.thread_handles.len()
    }

    /// Wait for every worker to exit
    pub fn join(self) {
        for handle in self.thread_handles {
            if handle.join().is_err() {
                log::warn!("Service worker panicked before shutdown");
            }
        }
    }
}
