//! Listing filters and pagination

use serde::{Deserialize, Serialize};

use crate::models::{Note, UserId};

/// Page size used when the caller does not ask for one (or asks for zero).
pub const DEFAULT_LIMIT: u32 = 20;
/// Largest page size a caller can get.
pub const MAX_LIMIT: u32 = 100;

/// A clamped page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Clamp raw values: `page` floors to 1 and is treated as absent when it
    /// does not fit a `u32`; `limit` falls back to the default when missing or
    /// zero and is otherwise clamped to `[1, MAX_LIMIT]`.
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.map_or(1, |page| u32::try_from(page.max(1)).unwrap_or(1));
        let limit = match limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(limit) => limit
                .clamp(1, i64::from(MAX_LIMIT))
                .try_into()
                .unwrap_or(DEFAULT_LIMIT),
        };
        Self { page, limit }
    }

    /// Number of notes skipped before this page
    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.limit)
    }

    /// Total number of pages needed for `total` notes
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

/// Everything a caller can ask of the list operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub pagination: Pagination,
    pub archived: Option<bool>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

/// Store-level filter; always scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFilter {
    pub owner: UserId,
    pub archived: Option<bool>,
    pub pinned: Option<bool>,
    /// Exact tag match
    pub tag: Option<String>,
    /// Case-insensitive substring of title or content
    pub search: Option<String>,
}

impl NoteFilter {
    /// All notes of `owner`
    #[must_use]
    pub const fn owned_by(owner: UserId) -> Self {
        Self {
            owner,
            archived: None,
            pinned: None,
            tag: None,
            search: None,
        }
    }

    #[must_use]
    pub const fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    #[must_use]
    pub const fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    /// Filter for a list request, dropping blank tag/search values.
    #[must_use]
    pub fn for_list(owner: UserId, query: &ListQuery) -> Self {
        Self {
            owner,
            archived: query.archived,
            pinned: None,
            tag: crate::util::normalize_text_option(query.tag.clone()),
            search: crate::util::normalize_text_option(query.search.clone()),
        }
    }
}

/// Pagination metadata returned with every list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

/// One page of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePage {
    pub meta: PageMeta,
    pub notes: Vec<Note>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn limit_is_clamped() {
        assert_eq!(Pagination::new(None, Some(500)).limit, 100);
        assert_eq!(Pagination::new(None, Some(0)).limit, 20);
        assert_eq!(Pagination::new(None, None).limit, 20);
        assert_eq!(Pagination::new(None, Some(-5)).limit, 1);
        assert_eq!(Pagination::new(None, Some(35)).limit, 35);
    }

    #[test]
    fn page_floors_to_one() {
        assert_eq!(Pagination::new(Some(0), None).page, 1);
        assert_eq!(Pagination::new(Some(-3), None).page, 1);
        assert_eq!(Pagination::new(None, None).page, 1);
        assert_eq!(Pagination::new(Some(4), None).page, 4);
        assert_eq!(Pagination::new(Some(i64::from(u32::MAX)), None).page, u32::MAX);
        assert_eq!(Pagination::new(Some(i64::from(u32::MAX) + 1), None).page, 1);
    }

    #[test]
    fn offset_and_pages() {
        let pagination = Pagination::new(Some(3), Some(10));
        assert_eq!(pagination.offset(), 20);
        assert_eq!(pagination.pages(0), 0);
        assert_eq!(pagination.pages(10), 1);
        assert_eq!(pagination.pages(21), 3);
    }

    #[test]
    fn list_filter_drops_blank_values() {
        let query = ListQuery {
            tag: Some("  ".to_string()),
            search: Some(" milk ".to_string()),
            archived: Some(false),
            ..ListQuery::default()
        };
        let filter = NoteFilter::for_list(UserId::new("u"), &query);
        assert_eq!(filter.tag, None);
        assert_eq!(filter.search.as_deref(), Some("milk"));
        assert_eq!(filter.archived, Some(false));
    }
}
