//! Note model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::util::{normalize_tags, now_millis, search_text};

/// A unique identifier for a note, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of an authenticated user, as issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A note owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    /// Owning user, fixed at creation
    pub owner: UserId,
    /// Never empty
    pub title: String,
    pub content: String,
    /// Ordered, duplicates allowed
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NewNote {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update: each `Some` field is written, each `None` is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
    pub is_pinned: Option<bool>,
}

/// Boolean note flags that can be flipped in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteFlag {
    Pinned,
    Archived,
}

impl NoteFlag {
    /// Column backing this flag in the notes table
    pub const fn column(self) -> &'static str {
        match self {
            Self::Pinned => "is_pinned",
            Self::Archived => "is_archived",
        }
    }
}

impl Note {
    /// Build a new note for `owner`, applying defaults.
    ///
    /// Title, content and tags are trimmed; callers validate the title first.
    #[must_use]
    pub fn new(owner: UserId, new: NewNote) -> Self {
        let now = now_millis();
        Self {
            id: NoteId::new(),
            owner,
            title: new.title.trim().to_string(),
            content: new
                .content
                .map(|content| content.trim().to_string())
                .unwrap_or_default(),
            tags: new.tags.map(normalize_tags).unwrap_or_default(),
            is_archived: false,
            is_pinned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the present fields of `update` and refresh `updated_at`.
    pub fn apply(&mut self, update: NoteUpdate) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(content) = update.content {
            self.content = content.trim().to_string();
        }
        if let Some(tags) = update.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(is_archived) = update.is_archived {
            self.is_archived = is_archived;
        }
        if let Some(is_pinned) = update.is_pinned {
            self.is_pinned = is_pinned;
        }
        self.updated_at = now_millis().max(self.updated_at);
    }

    /// Lowercased title and content, as stored for search
    pub fn search_text(&self) -> String {
        search_text(&self.title, &self.content)
    }

    /// Current value of `flag`
    pub const fn flag(&self, flag: NoteFlag) -> bool {
        match flag {
            NoteFlag::Pinned => self.is_pinned,
            NoteFlag::Archived => self.is_archived,
        }
    }
}
