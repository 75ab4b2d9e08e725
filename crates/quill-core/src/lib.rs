//! quill-core - Core library for Quill
//!
//! This crate contains the note model, the document store abstraction with
//! its libSQL implementation, and the note service used by the HTTP API.

pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod services;
pub mod util;
pub mod validation;

pub use error::{Error, Result};
pub use models::{NewNote, Note, NoteId, NoteUpdate, UserId};
pub use services::NoteService;
