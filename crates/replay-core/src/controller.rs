//! Replay controller
//!
//! Orchestrates user actions (play, stop, label edits, comments) against the
//! remote services and keeps the [`ReplayListStore`] in step with the server.
//!
//! The controller is driven from a single event loop thread:
//!
//! 1. A user action calls one of the operation methods. The method updates
//!    local state, hands a request to the [`RequestSink`] and returns without
//!    waiting for the network.
//! 2. When the request finishes, the loop passes its [`Completion`] to
//!    [`ReplayController::handle_completion`], which runs the continuation
//!    (refresh, draft clearing, edit settling) and reports a [`ReplayEvent`].
//!
//! Completions may arrive in any order. Refresh ordering and the
//! refresh/edit race are resolved by the store's tickets and overlays, and
//! label updates for one replay are sent one at a time, with later edits
//! coalesced into a single queued update.

use std::collections::HashMap;

use thiserror::Error;

use crate::resource::ApiError;
use crate::services::{Completion, RemoteReply, RemoteRequest, RequestId, RequestSink};
use crate::store::{EditVersion, RefreshOutcome, RefreshTicket, ReplayListStore, Snapshot};
use crate::types::{CommentDraft, Replay, ReplayTag, TagDraft, TagRef};

/// Errors returned by controller operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Controller has not been initialized")]
    NotInitialized,

    #[error("Controller has been disposed")]
    Disposed,

    #[error("Replay not found: {0}")]
    UnknownReplay(ReplayTag),

    #[error("Tag name is empty")]
    EmptyTagName,

    #[error("Comment text is empty")]
    EmptyComment,

    /// The request never left the client
    #[error("Failed to dispatch {kind} request: {source}")]
    Dispatch {
        kind: &'static str,
        #[source]
        source: ApiError,
    },
}

/// Result type for controller operations
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Active,
    Disposed,
}

/// Outcome of a finished request, for the front-end to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEvent {
    /// Collection replaced by a server snapshot
    Refreshed {
        version: u64,
        count: usize,
        preserved_edits: usize,
    },
    /// A newer refresh was already applied; this response was dropped
    RefreshDiscarded { seq: u64, latest: u64 },
    RefreshFailed { error: ApiError },

    PlaybackStarted {
        tag: ReplayTag,
        /// Server's copy of the replay, not merged into the collection
        replay: Option<Replay>,
    },
    PlaybackFailed { tag: ReplayTag, error: ApiError },

    StopAcknowledged,
    StopFailed { error: ApiError },

    CommentSaved { tag: ReplayTag },
    CommentFailed { tag: ReplayTag, error: ApiError },

    TagsSaved { tag: ReplayTag },
    TagsRejected {
        tag: ReplayTag,
        error: ApiError,
        /// Local labels went back to the last accepted list; `false` when a
        /// newer queued edit was sent instead
        reverted: bool,
    },
}

/// Continuation waiting for a request
#[derive(Debug)]
enum Pending {
    Refresh(RefreshTicket),
    Play(ReplayTag),
    Stop,
    Comment { tag: ReplayTag, text: String },
    Tags {
        tag: ReplayTag,
        version: EditVersion,
        tags: Vec<TagRef>,
    },
}

/// Per-replay label update queue
#[derive(Debug, Default)]
struct TagUpdateSlot {
    in_flight: bool,
    queued: Option<(Vec<TagRef>, EditVersion)>,
}

/// Controller for the replay list view
pub struct ReplayController<S: RequestSink> {
    sink: S,
    store: ReplayListStore,
    comment_draft: CommentDraft,
    tag_draft: TagDraft,
    pending: HashMap<RequestId, Pending>,
    tag_updates: HashMap<ReplayTag, TagUpdateSlot>,
    next_id: RequestId,
    lifecycle: Lifecycle,
}

impl<S: RequestSink> ReplayController<S> {
    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a controller with an empty collection
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            store: ReplayListStore::new(),
            comment_draft: CommentDraft::default(),
            tag_draft: TagDraft::default(),
            pending: HashMap::new(),
            tag_updates: HashMap::new(),
            next_id: 1,
            lifecycle: Lifecycle::Created,
        }
    }

    /// Activate the controller and load the collection
    pub fn init(&mut self) -> ControllerResult<RequestId> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(ControllerError::Disposed);
        }
        self.lifecycle = Lifecycle::Active;
        log::info!("Replay controller initialized");
        self.refresh()
    }

    /// Tear down: drop the collection, drafts and pending continuations
    ///
    /// Completions arriving afterwards are ignored.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        if !self.pending.is_empty() {
            log::debug!("Disposing with {} requests in flight", self.pending.len());
        }
        self.lifecycle = Lifecycle::Disposed;
        self.pending.clear();
        self.tag_updates.clear();
        self.store.clear();
        self.comment_draft.clear();
        self.tag_draft.clear();
        log::info!("Replay controller disposed");
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn ensure_active(&self) -> ControllerResult<()> {
        match self.lifecycle {
            Lifecycle::Active => Ok(()),
            Lifecycle::Created => Err(ControllerError::NotInitialized),
            Lifecycle::Disposed => Err(ControllerError::Disposed),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn store(&self) -> &ReplayListStore {
        &self.store
    }

    pub fn replay(&self, tag: &ReplayTag) -> Option<&Replay> {
        self.store.get(tag)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Number of requests whose completion hasn't been handled yet
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn comment_draft(&self) -> &CommentDraft {
        &self.comment_draft
    }

    pub fn set_comment_text(&mut self, text: impl Into<String>) {
        self.comment_draft.text = text.into();
    }

    pub fn tag_draft(&self) -> &TagDraft {
        &self.tag_draft
    }

    pub fn set_tag_name(&mut self, name: impl Into<String>) {
        self.tag_draft.name = name.into();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Re-fetch the whole collection
    pub fn refresh(&mut self) -> ControllerResult<RequestId> {
        self.ensure_active()?;
        let ticket = self.store.begin_refresh();
        self.send(Pending::Refresh(ticket), RemoteRequest::QueryAll)
    }

    /// Ask the server to play a replay
    ///
    /// The reply is reported but never merged into the collection.
    pub fn play_replay(&mut self, tag: &ReplayTag) -> ControllerResult<RequestId> {
        self.ensure_active()?;
        self.send(
            Pending::Play(tag.clone()),
            RemoteRequest::Play { tag: tag.clone() },
        )
    }

    /// Stop every running replay
    ///
    /// The protocol has no per-replay stop, so there is nothing to select.
    pub fn stop_all(&mut self) -> ControllerResult<RequestId> {
        self.ensure_active()?;
        self.send(Pending::Stop, RemoteRequest::Stop { tag: ReplayTag::all() })
    }

    /// Submit the comment draft for a replay
    ///
    /// The draft is cleared only once the server accepts the comment. Like
    /// playback, the request is scoped to `tag` whether or not the replay
    /// is in the local collection yet; the server rejects unknown tags.
    pub fn submit_comment(&mut self, tag: &ReplayTag) -> ControllerResult<RequestId> {
        self.ensure_active()?;
        if self.comment_draft.is_blank() {
            return Err(ControllerError::EmptyComment);
        }

        let comment = self.comment_draft.clone();
        self.send(
            Pending::Comment {
                tag: tag.clone(),
                text: comment.text.clone(),
            },
            RemoteRequest::SaveComment {
                tag: tag.clone(),
                comment,
            },
        )
    }

    /// Append the tag draft to a replay's labels and send the whole list
    ///
    /// The draft is cleared as soon as the edit is made, whatever the
    /// request's outcome.
    pub fn add_tag(&mut self, tag: &ReplayTag) -> ControllerResult<()> {
        self.ensure_active()?;
        if self.tag_draft.is_blank() {
            return Err(ControllerError::EmptyTagName);
        }
        let replay = self
            .store
            .get(tag)
            .ok_or_else(|| ControllerError::UnknownReplay(tag.clone()))?;

        let mut tags = replay.metadata.tags.clone();
        tags.push(TagRef::new(self.tag_draft.name.clone()));
        self.tag_draft.clear();

        self.push_tags(tag, tags)
    }

    /// Remove the first label named like `label` and send the whole list
    ///
    /// Returns `false` (and sends nothing) when no label has that name.
    pub fn remove_tag(&mut self, tag: &ReplayTag, label: &TagRef) -> ControllerResult<bool> {
        self.ensure_active()?;
        let replay = self
            .store
            .get(tag)
            .ok_or_else(|| ControllerError::UnknownReplay(tag.clone()))?;

        let Some(index) = replay.metadata.tags.iter().position(|t| t.name == label.name) else {
            return Ok(false);
        };

        let mut tags = replay.metadata.tags.clone();
        tags.remove(index);
        self.push_tags(tag, tags)?;
        Ok(true)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Completions
    // ═══════════════════════════════════════════════════════════════════════

    /// Run the continuation for a finished request
    ///
    /// Returns `None` for completions the controller no longer waits for
    /// (unknown id, or after [`dispose`](Self::dispose)).
    pub fn handle_completion(&mut self, completion: Completion) -> Option<ReplayEvent> {
        let Completion { id, result } = completion;

        if self.lifecycle == Lifecycle::Disposed {
            log::debug!("Ignoring completion #{} after dispose", id);
            return None;
        }
        let Some(pending) = self.pending.remove(&id) else {
            log::debug!("Ignoring completion #{} with no pending request", id);
            return None;
        };

        let event = match pending {
            Pending::Refresh(ticket) => self.finish_refresh(ticket, result),
            Pending::Play(tag) => match result {
                Ok(RemoteReply::Played(replay)) => ReplayEvent::PlaybackStarted { tag, replay },
                Ok(_) => ReplayEvent::PlaybackStarted { tag, replay: None },
                Err(error) => ReplayEvent::PlaybackFailed { tag, error },
            },
            Pending::Stop => match result {
                Ok(_) => ReplayEvent::StopAcknowledged,
                Err(error) => ReplayEvent::StopFailed { error },
            },
            Pending::Comment { tag, text } => self.finish_comment(tag, text, result),
            Pending::Tags { tag, version, tags } => self.finish_tags(tag, version, tags, result),
        };

        match &event {
            ReplayEvent::RefreshFailed { error }
            | ReplayEvent::PlaybackFailed { error, .. }
            | ReplayEvent::StopFailed { error }
            | ReplayEvent::CommentFailed { error, .. }
            | ReplayEvent::TagsRejected { error, .. } => {
                log::warn!("Request #{} failed: {}", id, error);
            }
            _ => log::debug!("Request #{} finished: {:?}", id, event),
        }

        Some(event)
    }

    fn finish_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<RemoteReply, ApiError>,
    ) -> ReplayEvent {
        let replays = match result {
            Ok(RemoteReply::Replays(replays)) => replays,
            Ok(_) => {
                return ReplayEvent::RefreshFailed {
                    error: ApiError::UnexpectedReply("query"),
                }
            }
            Err(error) => return ReplayEvent::RefreshFailed { error },
        };

        match self.store.apply_refresh(ticket, replays) {
            RefreshOutcome::Applied {
                version,
                count,
                preserved_edits,
            } => ReplayEvent::Refreshed {
                version,
                count,
                preserved_edits,
            },
            RefreshOutcome::Stale { seq, latest } => ReplayEvent::RefreshDiscarded { seq, latest },
        }
    }

    fn finish_comment(
        &mut self,
        tag: ReplayTag,
        text: String,
        result: Result<RemoteReply, ApiError>,
    ) -> ReplayEvent {
        match result {
            Ok(_) => {
                // Keep anything typed while the request was out
                if self.comment_draft.text == text {
                    self.comment_draft.clear();
                }
                self.refresh_after(&tag);
                ReplayEvent::CommentSaved { tag }
            }
            Err(error) => ReplayEvent::CommentFailed { tag, error },
        }
    }

    fn finish_tags(
        &mut self,
        tag: ReplayTag,
        version: EditVersion,
        tags: Vec<TagRef>,
        result: Result<RemoteReply, ApiError>,
    ) -> ReplayEvent {
        let event = match result {
            Ok(_) => {
                if !self.store.settle_edit(&tag, version) {
                    // A newer edit is queued; it now reverts to this list
                    self.store.confirm_superseded(&tag, version, tags);
                }
                ReplayEvent::TagsSaved { tag: tag.clone() }
            }
            Err(error) => {
                let reverted = self.store.discard_edit(&tag, version);
                ReplayEvent::TagsRejected {
                    tag: tag.clone(),
                    error,
                    reverted,
                }
            }
        };

        let queued = self.tag_updates.get_mut(&tag).and_then(|slot| {
            slot.in_flight = false;
            slot.queued.take()
        });

        match queued {
            Some((tags, queued_version)) => {
                if let Err(e) = self.send_tags(&tag, tags, queued_version) {
                    log::warn!("Queued tag update for {} not sent: {}", tag, e);
                    self.refresh_after(&tag);
                }
            }
            None => {
                self.tag_updates.remove(&tag);
                self.refresh_after(&tag);
            }
        }

        event
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════

    fn send(&mut self, pending: Pending, request: RemoteRequest) -> ControllerResult<RequestId> {
        let id = self.next_id;
        self.next_id += 1;

        let kind = request.kind();
        self.sink
            .dispatch(id, request)
            .map_err(|source| ControllerError::Dispatch { kind, source })?;

        log::debug!("Request #{} ({}) in flight", id, kind);
        self.pending.insert(id, pending);
        Ok(id)
    }

    /// Record a label edit locally and send or queue its update
    fn push_tags(&mut self, tag: &ReplayTag, tags: Vec<TagRef>) -> ControllerResult<()> {
        let version = self
            .store
            .replace_tags(tag, tags.clone())
            .ok_or_else(|| ControllerError::UnknownReplay(tag.clone()))?;

        let slot = self.tag_updates.entry(tag.clone()).or_default();
        if slot.in_flight {
            log::debug!("Tag update for {} in flight, queueing latest list", tag);
            slot.queued = Some((tags, version));
            return Ok(());
        }

        self.send_tags(tag, tags, version)
    }

    fn send_tags(
        &mut self,
        tag: &ReplayTag,
        tags: Vec<TagRef>,
        version: EditVersion,
    ) -> ControllerResult<()> {
        let sent = self.send(
            Pending::Tags {
                tag: tag.clone(),
                version,
                tags: tags.clone(),
            },
            RemoteRequest::UpdateTags {
                tag: tag.clone(),
                tags,
            },
        );

        match sent {
            Ok(_) => {
                self.tag_updates.entry(tag.clone()).or_default().in_flight = true;
                Ok(())
            }
            Err(e) => {
                self.store.discard_edit(tag, version);
                self.tag_updates.remove(tag);
                Err(e)
            }
        }
    }

    /// Follow-up refresh issued from a continuation
    fn refresh_after(&mut self, tag: &ReplayTag) {
        if let Err(e) = self.refresh() {
            log::warn!("Refresh after update of {} not sent: {}", tag, e);
        }
    }
}
