//! In-memory server fakes shared by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crossbeam::channel::{Receiver, Sender};

use crate::resource::{ApiError, ApiResult, ReplayMetadataService, ReplayResource};
use crate::types::{Comment, CommentDraft, Replay, ReplayTag, TagRef};

/// A replay server kept in memory
#[derive(Default)]
pub(crate) struct InMemoryReplayApi {
    replays: Mutex<Vec<Replay>>,
    holds: Mutex<HashMap<String, Receiver<()>>>,
    pub stops: AtomicUsize,
    pub plays: AtomicUsize,
}

impl InMemoryReplayApi {
    pub fn with_replays(replays: Vec<Replay>) -> Self {
        Self {
            replays: Mutex::new(replays),
            ..Default::default()
        }
    }

    /// Make `get` for `tag` block until the returned sender fires
    pub fn hold_play(&self, tag: &str) -> Sender<()> {
        let (tx, rx) = crossbeam::channel::bounded(1);
        self.holds.lock().unwrap().insert(tag.to_string(), rx);
        tx
    }

    pub fn replays(&self) -> Vec<Replay> {
        self.replays.lock().unwrap().clone()
    }

    fn not_found(tag: &ReplayTag) -> ApiError {
        ApiError::Rejected {
            status: 404,
            body: format!("The specified tag {} does not exist.", tag),
        }
    }
}

impl ReplayResource for InMemoryReplayApi {
    fn query(&self) -> ApiResult<Vec<Replay>> {
        Ok(self.replays())
    }

    fn get(&self, tag: &ReplayTag) -> ApiResult<Option<Replay>> {
        let hold = self.holds.lock().unwrap().remove(tag.as_str());
        if let Some(rx) = hold {
            let _ = rx.recv();
        }
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.replays()
            .into_iter()
            .find(|r| &r.tag == tag)
            .map(Some)
            .ok_or_else(|| Self::not_found(tag))
    }

    fn stop(&self, _tag: &ReplayTag) -> ApiResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ReplayMetadataService for InMemoryReplayApi {
    fn update_tags(&self, tag: &ReplayTag, tags: &[TagRef]) -> ApiResult<()> {
        let mut replays = self.replays.lock().unwrap();
        let replay = replays
            .iter_mut()
            .find(|r| &r.tag == tag)
            .ok_or_else(|| Self::not_found(tag))?;
        replay.metadata.tags = tags.to_vec();
        Ok(())
    }

    fn save_comment(&self, tag: &ReplayTag, comment: &CommentDraft) -> ApiResult<()> {
        let mut replays = self.replays.lock().unwrap();
        let replay = replays
            .iter_mut()
            .find(|r| &r.tag == tag)
            .ok_or_else(|| Self::not_found(tag))?;
        replay.metadata.comments.push(Comment {
            text: comment.text.clone(),
        });
        Ok(())
    }
}
