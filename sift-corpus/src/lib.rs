//! sift-corpus - Knowledge corpus storage
//!
//! This crate owns the data model of the support-intelligence knowledge
//! loop (corpus entries, articles, provenance, resolved cases, retrieval
//! logs, execution records, learning events) and the storage traits the
//! rest of the system writes through. The in-memory backend keeps one lock
//! per corpus row so confidence updates stay serializable under concurrent
//! case closures.

pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::{
    ArticleStore, CaseStore, ConversationStore, CorpusStore, ExecutionStore, LearningEventStore,
    MemoryStore, RetrievalLogStore, ScriptCatalog, SearchFilter,
};
pub use types::*;
