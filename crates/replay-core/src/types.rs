//! Common types for the replay desk
//!
//! This module contains the replay data model shared between the remote
//! resource layer, the collection store and the controller. Field names
//! follow the server's camelCase JSON documents.

use serde::{Deserialize, Serialize};

/// Tag value the server interprets as "every running replay"
pub const STOP_ALL_TAG: &str = "all";

/// Opaque identifier of a recorded replay
///
/// Not to be confused with [`TagRef`], which is a user-assigned label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplayTag(pub String);

impl ReplayTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The global stop sentinel
    pub fn all() -> Self {
        Self(STOP_ALL_TAG.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReplayTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-assigned label on a replay
///
/// The client does not enforce unique names; duplicates are legal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub name: String,
}

impl TagRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A stored comment on a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

/// Replay metadata as stored by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

/// A recorded race session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replay {
    /// Unique identifier
    pub tag: ReplayTag,
    /// ISO-8601 recording timestamp, when the server provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    /// Comments and labels
    #[serde(default)]
    pub metadata: Metadata,
}

impl Replay {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: ReplayTag::new(tag),
            creation_date: None,
            metadata: Metadata::default(),
        }
    }

    /// Builder-style helper to attach labels
    pub fn with_tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.tags = names.into_iter().map(TagRef::new).collect();
        self
    }

    /// Label names in order
    pub fn tag_names(&self) -> Vec<&str> {
        self.metadata.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

// ============================================================================
// Drafts (controller-owned, transient)
// ============================================================================

/// Comment text being composed by the user
///
/// Serializes to the comment-create request body `{"text": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDraft {
    pub text: String,
}

impl CommentDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// Label name being composed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDraft {
    pub name: String,
}

impl TagDraft {
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.name.clear();
    }
}
