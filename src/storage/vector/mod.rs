//! Vector store adapters.

mod memory;
mod milvus;
mod weaviate;

pub use memory::InMemoryBackend;
pub use milvus::MilvusBackend;
pub use weaviate::WeaviateBackend;
