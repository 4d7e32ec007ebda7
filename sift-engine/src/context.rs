//! Shared engine context: stores, provider ports, and configuration.

use std::sync::Arc;

use sift_corpus::{
    ArticleStore, CaseStore, ConversationStore, CorpusStore, ExecutionStore, LearningEventStore,
    MemoryStore, RetrievalLogStore, ScriptCatalog,
};
use sift_models::{EmbeddingPort, GenerationPort, RerankPort};

use crate::EngineConfig;

/// Everything a pipeline run or coordinator run needs.
///
/// Stores and ports are shared singletons; each run owns only its state
/// record, so any number of runs can proceed concurrently.
pub struct EngineContext {
    pub corpus: Arc<dyn CorpusStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub logs: Arc<dyn RetrievalLogStore>,
    pub executions: Arc<dyn ExecutionStore>,
    pub events: Arc<dyn LearningEventStore>,
    pub cases: Arc<dyn CaseStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub scripts: Arc<dyn ScriptCatalog>,
    pub embedder: Arc<dyn EmbeddingPort>,
    pub generator: Arc<dyn GenerationPort>,
    pub reranker: Option<Arc<dyn RerankPort>>,
    pub config: EngineConfig,
}

impl EngineContext {
    /// Build a context where one [`MemoryStore`] backs every store trait.
    pub fn with_memory_store(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingPort>,
        generator: Arc<dyn GenerationPort>,
        reranker: Option<Arc<dyn RerankPort>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            corpus: store.clone(),
            articles: store.clone(),
            logs: store.clone(),
            executions: store.clone(),
            events: store.clone(),
            cases: store.clone(),
            conversations: store.clone(),
            scripts: store,
            embedder,
            generator,
            reranker,
            config,
        }
    }
}
