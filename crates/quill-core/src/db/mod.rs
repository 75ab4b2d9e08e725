//! Database layer for Quill

mod connection;
mod migrations;
mod store;

pub use connection::{Database, ReplicaConfig};
pub use store::{LibSqlNoteStore, NoteStore};
