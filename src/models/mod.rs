//! Data models for ragstore.
//!
//! These types form the data contract between ragstore, upstream document
//! producers, and downstream query/chat consumers.

mod document;
mod search;

pub use document::{Document, Metadata};
pub use search::{AnswerStatus, QueryAnswer};
