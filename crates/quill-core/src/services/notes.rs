//! Note service: CRUD, listing and statistics scoped to the calling user.

use std::sync::Arc;

use crate::db::NoteStore;
use crate::error::{Error, Result};
use crate::models::{NewNote, Note, NoteFlag, NoteId, NoteStats, NoteUpdate, UserId};
use crate::query::{ListQuery, NoteFilter, NotePage, PageMeta};
use crate::util::now_millis;
use crate::validation::ValidationErrors;

use super::access::authorize;

/// Note operations on behalf of an authenticated caller.
///
/// Holds no state of its own; all shared state lives in the store.
#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn NoteStore>,
}

impl NoteService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Create a note owned by `caller`
    pub async fn create(&self, caller: &UserId, new: NewNote) -> Result<Note> {
        if new.title.trim().is_empty() {
            return Err(ValidationErrors::single("title", "Title is required").into());
        }

        let note = Note::new(caller.clone(), new);
        self.store.insert(&note).await?;
        tracing::debug!(note_id = %note.id, "Created note");
        Ok(note)
    }

    /// One page of the caller's notes, pinned first, then most recently updated
    pub async fn list(&self, caller: &UserId, query: &ListQuery) -> Result<NotePage> {
        let filter = NoteFilter::for_list(caller.clone(), query);
        let pagination = query.pagination;

        let (total, notes) = tokio::try_join!(
            self.store.count(&filter),
            self.store
                .find(&filter, pagination.offset(), pagination.limit),
        )?;

        Ok(NotePage {
            meta: PageMeta {
                total,
                page: pagination.page,
                limit: pagination.limit,
                pages: pagination.pages(total),
            },
            notes,
        })
    }

    pub async fn get(&self, caller: &UserId, id: &NoteId) -> Result<Note> {
        self.load_owned(caller, id).await
    }

    /// Apply the fields present in `update`
    pub async fn update(&self, caller: &UserId, id: &NoteId, update: NoteUpdate) -> Result<Note> {
        if update
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(ValidationErrors::single("title", "Title cannot be empty").into());
        }

        self.load_owned(caller, id).await?;
        let note = self
            .store
            .update(id, update)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        tracing::debug!(note_id = %id, "Updated note");
        Ok(note)
    }

    /// Permanently remove a note
    pub async fn delete(&self, caller: &UserId, id: &NoteId) -> Result<()> {
        self.load_owned(caller, id).await?;
        if !self.store.delete(id).await? {
            return Err(Error::NotFound(id.to_string()));
        }
        tracing::debug!(note_id = %id, "Deleted note");
        Ok(())
    }

    pub async fn toggle_pin(&self, caller: &UserId, id: &NoteId) -> Result<Note> {
        self.toggle(caller, id, NoteFlag::Pinned).await
    }

    pub async fn toggle_archive(&self, caller: &UserId, id: &NoteId) -> Result<Note> {
        self.toggle(caller, id, NoteFlag::Archived).await
    }

    /// Totals and tag breakdown over all of the caller's notes
    pub async fn stats(&self, caller: &UserId) -> Result<NoteStats> {
        let all = NoteFilter::owned_by(caller.clone());
        let pinned = all.clone().pinned(true);
        let archived = all.clone().archived(true);

        let (total, pinned, archived, tags) = tokio::try_join!(
            self.store.count(&all),
            self.store.count(&pinned),
            self.store.count(&archived),
            self.store.tag_counts(caller),
        )?;

        Ok(NoteStats {
            total,
            pinned,
            archived,
            tags,
        })
    }

    async fn toggle(&self, caller: &UserId, id: &NoteId, flag: NoteFlag) -> Result<Note> {
        self.load_owned(caller, id).await?;
        let note = self
            .store
            .toggle(id, flag, now_millis())
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        tracing::debug!(note_id = %id, ?flag, value = note.flag(flag), "Toggled note flag");
        Ok(note)
    }

    /// Existence and ownership check shared by every by-ID operation
    async fn load_owned(&self, caller: &UserId, id: &NoteId) -> Result<Note> {
        let note = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        authorize(caller, &note)?;
        Ok(note)
    }
}
