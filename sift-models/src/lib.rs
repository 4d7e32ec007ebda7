//! sift-models - Provider ports
//!
//! The three narrow interfaces the retrieval and learning pipelines depend
//! on: batch embeddings, structured chat generation, and optional
//! reranking. HTTP implementations target OpenAI- and Cohere-compatible
//! endpoints; the [`mock`] module ships deterministic in-process
//! implementations for tests.

pub mod error;
pub mod mock;
mod ports;
pub mod providers;
mod types;

pub use error::{Error, Result};
pub use ports::{generate_as, EmbeddingPort, GenerationPort, RerankPort};
pub use types::*;
