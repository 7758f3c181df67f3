//! Storage backend traits.

mod store;

pub use store::{ConnectionState, QueryAgent, VectorStore};
