//! Aggregate statistics over a user's notes

use serde::{Deserialize, Serialize};

/// Number of occurrences of one tag across a user's notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    /// Grouping key, kept alongside `tag` for clients that read `_id`
    #[serde(rename = "_id")]
    pub id: String,
    pub tag: String,
    pub count: u64,
}

impl TagCount {
    #[must_use]
    pub fn new(tag: impl Into<String>, count: u64) -> Self {
        let tag = tag.into();
        Self {
            id: tag.clone(),
            tag,
            count,
        }
    }
}

/// Totals for one user, with tags sorted by descending count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteStats {
    pub total: u64,
    pub pinned: u64,
    pub archived: u64,
    pub tags: Vec<TagCount>,
}
