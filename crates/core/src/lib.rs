//! `fablab-core`: identifiers and errors shared by every FabLab crate.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{LogEntryId, RecordId, UserId};
