//! Document store abstraction and its libSQL implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params::Params;
use libsql::{Row, Value};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Note, NoteFlag, NoteId, NoteUpdate, TagCount, UserId};
use crate::query::NoteFilter;

const NOTE_COLUMNS: &str =
    "id, owner, title, content, tags, is_archived, is_pinned, created_at, updated_at";

/// Durable keyed storage for notes.
///
/// Every write touches a single note and is atomic on its own; the store
/// is responsible for its own concurrency control.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Persist a freshly created note
    async fn insert(&self, note: &Note) -> Result<()>;

    /// Fetch a note by ID regardless of owner
    async fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// Notes matching `filter`, pinned first, then most recently updated
    async fn find(&self, filter: &NoteFilter, offset: u64, limit: u32) -> Result<Vec<Note>>;

    /// Number of notes matching `filter`
    async fn count(&self, filter: &NoteFilter) -> Result<u64>;

    /// Write the fields present in `update` and return the note as stored
    /// afterwards; `None` if it is gone.
    ///
    /// Columns the update leaves out are not rewritten, so a concurrent
    /// toggle is never undone.
    async fn update(&self, id: &NoteId, update: NoteUpdate) -> Result<Option<Note>>;

    /// Flip `flag` in a single write and return the note as stored afterwards
    async fn toggle(
        &self,
        id: &NoteId,
        flag: NoteFlag,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Note>>;

    /// Permanently remove a note; `false` if it did not exist
    async fn delete(&self, id: &NoteId) -> Result<bool>;

    /// Occurrences of each tag across the owner's notes, most frequent first
    async fn tag_counts(&self, owner: &UserId) -> Result<Vec<TagCount>>;
}

/// libSQL implementation of `NoteStore`
pub struct LibSqlNoteStore {
    db: Mutex<Database>,
}

impl LibSqlNoteStore {
    /// Create a new store over an opened, migrated database
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Parse a note from a database row selected with `NOTE_COLUMNS`
    fn parse_note(row: &Row) -> Result<Note> {
        let id: String = row.get(0)?;
        let tags: String = row.get(4)?;
        Ok(Note {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("Invalid note ID in store: {id}")))?,
            owner: UserId::new(row.get::<String>(1)?),
            title: row.get(2)?,
            content: row.get(3)?,
            tags: serde_json::from_str(&tags)?,
            is_archived: row.get::<i32>(5)? != 0,
            is_pinned: row.get::<i32>(6)? != 0,
            created_at: from_millis(row.get(7)?)?,
            updated_at: from_millis(row.get(8)?)?,
        })
    }

    async fn get_with(conn: &libsql::Connection, id: &NoteId) -> Result<Option<Note>> {
        let mut rows = conn
            .query(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_note(&row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl NoteStore for LibSqlNoteStore {
    async fn insert(&self, note: &Note) -> Result<()> {
        let tags = serde_json::to_string(&note.tags)?;
        let db = self.db.lock().await;

        db.connection()
            .execute(
                &format!(
                    "INSERT INTO notes ({NOTE_COLUMNS}, search_text)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                Params::Positional(vec![
                    Value::Text(note.id.as_str()),
                    Value::Text(note.owner.as_str().to_string()),
                    Value::Text(note.title.clone()),
                    Value::Text(note.content.clone()),
                    Value::Text(tags),
                    Value::Integer(i64::from(note.is_archived)),
                    Value::Integer(i64::from(note.is_pinned)),
                    Value::Integer(note.created_at.timestamp_millis()),
                    Value::Integer(note.updated_at.timestamp_millis()),
                    Value::Text(note.search_text()),
                ]),
            )
            .await?;

        Ok(())
    }

    async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let db = self.db.lock().await;
        Self::get_with(db.connection(), id).await
    }

    async fn find(&self, filter: &NoteFilter, offset: u64, limit: u32) -> Result<Vec<Note>> {
        let (clause, mut values) = where_clause(filter);
        values.push(Value::Integer(i64::from(limit)));
        values.push(Value::Integer(offset as i64));

        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                &format!(
                    "SELECT {NOTE_COLUMNS}
                     FROM notes
                     WHERE {clause}
                     ORDER BY is_pinned DESC, updated_at DESC, id DESC
                     LIMIT ? OFFSET ?"
                ),
                Params::Positional(values),
            )
            .await?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(Self::parse_note(&row)?);
        }
        Ok(notes)
    }

    async fn count(&self, filter: &NoteFilter) -> Result<u64> {
        let (clause, values) = where_clause(filter);

        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                &format!("SELECT COUNT(*) FROM notes WHERE {clause}"),
                Params::Positional(values),
            )
            .await?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        u64::try_from(count).map_err(|_| Error::Database(format!("Negative count: {count}")))
    }

    async fn update(&self, id: &NoteId, update: NoteUpdate) -> Result<Option<Note>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let Some(mut note) = Self::get_with(conn, id).await? else {
            return Ok(None);
        };

        let title = update.title.is_some();
        let content = update.content.is_some();
        let tags = update.tags.is_some();
        let archived = update.is_archived.is_some();
        let pinned = update.is_pinned.is_some();
        note.apply(update);

        let mut assignments = Vec::new();
        let mut values = Vec::new();
        if title {
            assignments.push("title = ?");
            values.push(Value::Text(note.title.clone()));
        }
        if content {
            assignments.push("content = ?");
            values.push(Value::Text(note.content.clone()));
        }
        if title || content {
            assignments.push("search_text = ?");
            values.push(Value::Text(note.search_text()));
        }
        if tags {
            assignments.push("tags = ?");
            values.push(Value::Text(serde_json::to_string(&note.tags)?));
        }
        if archived {
            assignments.push("is_archived = ?");
            values.push(Value::Integer(i64::from(note.is_archived)));
        }
        if pinned {
            assignments.push("is_pinned = ?");
            values.push(Value::Integer(i64::from(note.is_pinned)));
        }
        assignments.push("updated_at = MAX(updated_at, ?)");
        values.push(Value::Integer(note.updated_at.timestamp_millis()));
        values.push(Value::Text(id.as_str()));

        conn.execute(
            &format!("UPDATE notes SET {} WHERE id = ?", assignments.join(", ")),
            Params::Positional(values),
        )
        .await?;

        Ok(Some(note))
    }

    async fn toggle(
        &self,
        id: &NoteId,
        flag: NoteFlag,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Note>> {
        let column = flag.column();
        let db = self.db.lock().await;
        let conn = db.connection();

        let rows = conn
            .execute(
                &format!(
                    "UPDATE notes
                     SET {column} = 1 - {column}, updated_at = MAX(updated_at, ?)
                     WHERE id = ?"
                ),
                Params::Positional(vec![
                    Value::Integer(updated_at.timestamp_millis()),
                    Value::Text(id.as_str()),
                ]),
            )
            .await?;

        if rows == 0 {
            return Ok(None);
        }

        Self::get_with(conn, id).await
    }

    async fn delete(&self, id: &NoteId) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db
            .connection()
            .execute("DELETE FROM notes WHERE id = ?", [id.as_str()])
            .await?;

        Ok(rows > 0)
    }

    async fn tag_counts(&self, owner: &UserId) -> Result<Vec<TagCount>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT je.value AS name, COUNT(*) AS occurrences
                 FROM notes, json_each(notes.tags) AS je
                 WHERE notes.owner = ?
                 GROUP BY je.value
                 ORDER BY occurrences DESC, name ASC",
                [owner.as_str()],
            )
            .await?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().await? {
            let name: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            tags.push(TagCount::new(name, u64::try_from(count).unwrap_or(0)));
        }
        Ok(tags)
    }
}

/// Build the `WHERE` clause and its positional values for `filter`
fn where_clause(filter: &NoteFilter) -> (String, Vec<Value>) {
    let mut clauses = vec!["owner = ?"];
    let mut values = vec![Value::Text(filter.owner.as_str().to_string())];

    if let Some(archived) = filter.archived {
        clauses.push("is_archived = ?");
        values.push(Value::Integer(i64::from(archived)));
    }
    if let Some(pinned) = filter.pinned {
        clauses.push("is_pinned = ?");
        values.push(Value::Integer(i64::from(pinned)));
    }
    if let Some(tag) = &filter.tag {
        clauses.push("EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = ?)");
        values.push(Value::Text(tag.clone()));
    }
    if let Some(search) = &filter.search {
        clauses.push("search_text LIKE ? ESCAPE '\\'");
        values.push(Value::Text(like_pattern(&search.to_lowercase())));
    }

    (clauses.join(" AND "), values)
}

/// Substring pattern for `LIKE`, with wildcards in `text` matched literally
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::Database(format!("Invalid timestamp in store: {millis}")))
}
