//! Service layer.
//!
//! - [`BackendFactory`] / [`BackendRegistry`]: kind string to backend instance
//! - [`RagService`]: application facade holding one backend

mod backend_factory;
mod rag;

pub use backend_factory::{BackendConstructor, BackendFactory, BackendRegistry, DEFAULT_BACKEND};
pub use rag::RagService;
