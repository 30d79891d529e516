//! Replay collection store
//!
//! Holds the ordered replay collection as an immutable, versioned snapshot.
//! Every change (an applied refresh or a local label edit) produces a new
//! collection version; readers keep whatever [`Snapshot`] they took.
//!
//! Two mechanisms keep the collection consistent with the server:
//!
//! - **Refresh tickets.** Each refresh gets a sequence number when it is
//!   issued. A response is applied only if no later-issued refresh has been
//!   applied already, so a slow old response can't overwrite a newer one.
//! - **Edit overlays.** A local label edit is stamped with the mutation
//!   clock. Until the edit's update request has settled, and until a refresh
//!   issued after settling is applied, snapshots keep the edited labels for
//!   that replay instead of the server's copy.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Replay, ReplayTag, TagRef};

/// Version stamp of a local label edit
pub type EditVersion = u64;

/// Issued with every refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    seq: u64,
    clock: u64,
}

/// What happened to a refresh response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Collection replaced
    Applied {
        version: u64,
        count: usize,
        /// Replays whose local label edit survived the refresh
        preserved_edits: usize,
    },
    /// A later-issued refresh was already applied; response dropped
    Stale { seq: u64, latest: u64 },
}

/// Immutable view of the collection at one version
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub version: u64,
    pub replays: Arc<Vec<Replay>>,
}

impl Snapshot {
    pub fn get(&self, tag: &ReplayTag) -> Option<&Replay> {
        self.replays.iter().find(|r| &r.tag == tag)
    }

    pub fn len(&self) -> usize {
        self.replays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replays.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Replay> {
        self.replays.iter()
    }
}

/// An unconfirmed or recently confirmed label edit
#[derive(Debug, Clone)]
struct LocalEdit {
    version: EditVersion,
    tags: Vec<TagRef>,
    /// Last labels known to be on the server, restored if the edit fails
    original: Vec<TagRef>,
    pending: bool,
    settled_at: Option<u64>,
}

impl LocalEdit {
    /// Whether a snapshot fetched with `ticket` may predate this edit
    fn overrides(&self, ticket: &RefreshTicket) -> bool {
        self.pending || self.settled_at.is_some_and(|at| at > ticket.clock)
    }
}

/// In-memory replay collection
#[derive(Debug, Default)]
pub struct ReplayListStore {
    replays: Arc<Vec<Replay>>,
    version: u64,
    /// Monotonic mutation clock; advances on every edit and settle
    clock: u64,
    next_seq: u64,
    applied_seq: Option<u64>,
    edits: HashMap<ReplayTag, LocalEdit>,
}

impl ReplayListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current collection version
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            replays: Arc::clone(&self.replays),
        }
    }

    pub fn get(&self, tag: &ReplayTag) -> Option<&Replay> {
        self.replays.iter().find(|r| &r.tag == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.replays.is_empty()
    }

    /// Whether the replay has a label edit awaiting confirmation
    pub fn has_pending_edit(&self, tag: &ReplayTag) -> bool {
        self.edits.get(tag).is_some_and(|e| e.pending)
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Hand out a ticket for a refresh about to be issued
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        let ticket = RefreshTicket {
            seq: self.next_seq,
            clock: self.clock,
        };
        self.next_seq += 1;
        ticket
    }

    /// Replace the collection with a refresh response
    ///
    /// Server order is kept as-is. Responses to refreshes issued before the
    /// last applied one are dropped.
    pub fn apply_refresh(
        &mut self,
        ticket: RefreshTicket,
        mut replays: Vec<Replay>,
    ) -> RefreshOutcome {
        if let Some(latest) = self.applied_seq {
            if ticket.seq <= latest {
                log::debug!(
                    "Dropping refresh #{} response, #{} already applied",
                    ticket.seq,
                    latest
                );
                return RefreshOutcome::Stale {
                    seq: ticket.seq,
                    latest,
                };
            }
        }
        self.applied_seq = Some(ticket.seq);

        let mut preserved_edits = 0;
        for replay in &mut replays {
            if let Some(edit) = self.edits.get(&replay.tag) {
                if edit.overrides(&ticket) {
                    replay.metadata.tags = edit.tags.clone();
                    preserved_edits += 1;
                }
            }
        }
        // Every later ticket has a clock at least this one's
        self.edits.retain(|_, edit| edit.overrides(&ticket));

        let count = replays.len();
        self.replays = Arc::new(replays);
        self.version += 1;

        RefreshOutcome::Applied {
            version: self.version,
            count,
            preserved_edits,
        }
    }

    // ========================================================================
    // Local label edits
    // ========================================================================

    /// Replace a replay's labels locally, returning the edit's version
    ///
    /// Returns `None` if the replay is not in the collection.
    pub fn replace_tags(&mut self, tag: &ReplayTag, tags: Vec<TagRef>) -> Option<EditVersion> {
        let index = self.replays.iter().position(|r| &r.tag == tag)?;

        let original = match self.edits.get(tag) {
            Some(edit) if edit.pending => edit.original.clone(),
            Some(edit) => edit.tags.clone(),
            None => self.replays[index].metadata.tags.clone(),
        };

        self.clock += 1;
        let version = self.clock;

        Arc::make_mut(&mut self.replays)[index].metadata.tags = tags.clone();
        self.version += 1;

        self.edits.insert(
            tag.clone(),
            LocalEdit {
                version,
                tags,
                original,
                pending: true,
                settled_at: None,
            },
        );
        Some(version)
    }

    /// Mark an edit as confirmed by the server
    ///
    /// Ignored unless `version` is the replay's latest edit.
    pub fn settle_edit(&mut self, tag: &ReplayTag, version: EditVersion) -> bool {
        let Some(edit) = self.edits.get_mut(tag) else {
            return false;
        };
        if edit.version != version {
            return false;
        }
        self.clock += 1;
        edit.pending = false;
        edit.settled_at = Some(self.clock);
        true
    }

    /// Record that an older edit was accepted while a newer one is pending
    ///
    /// The accepted labels become what a later discard restores. Ignored
    /// unless a newer edit of the replay is still pending.
    pub fn confirm_superseded(
        &mut self,
        tag: &ReplayTag,
        version: EditVersion,
        tags: Vec<TagRef>,
    ) -> bool {
        match self.edits.get_mut(tag) {
            Some(edit) if edit.pending && edit.version > version => {
                edit.original = tags;
                true
            }
            _ => false,
        }
    }

    /// Drop a rejected edit and restore the last server-known labels
    ///
    /// Ignored unless `version` is the replay's latest edit.
    pub fn discard_edit(&mut self, tag: &ReplayTag, version: EditVersion) -> bool {
        if !self.edits.get(tag).is_some_and(|e| e.version == version) {
            return false;
        }
        let Some(edit) = self.edits.remove(tag) else {
            return false;
        };

        if let Some(index) = self.replays.iter().position(|r| &r.tag == tag) {
            Arc::make_mut(&mut self.replays)[index].metadata.tags = edit.original;
            self.version += 1;
        }
        true
    }

    /// Empty the collection and forget all edits and tickets
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
