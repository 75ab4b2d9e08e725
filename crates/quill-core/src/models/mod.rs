//! Data models for Quill

mod note;
mod stats;

pub use note::{NewNote, Note, NoteFlag, NoteId, NoteUpdate, UserId};
pub use stats::{NoteStats, TagCount};
