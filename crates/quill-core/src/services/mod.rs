//! Business logic over the note store

mod access;
mod notes;

pub use access::authorize;
pub use notes::NoteService;
