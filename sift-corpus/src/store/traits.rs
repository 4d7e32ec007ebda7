//! Storage traits for the knowledge corpus and its audit tables.
//!
//! One trait per concern so backends can be swapped independently. The
//! reference backend is [`MemoryStore`](crate::store::MemoryStore), which
//! implements all of them.

use async_trait::async_trait;

use crate::{
    Article, ArticleStatus, ConfidenceUpdate, ConversationRecord, CorpusEntry, CorpusHit,
    ExecutionRecord, LearningEvent, ProvenanceRecord, ResolvedCase, Result, RetrievalLogEntry,
    RetrievalOutcome, ReviewStatus, ReviewerRole, ScriptMeta, SourceKind,
};

/// Optional filters for a vector search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Restrict to these source kinds. `None` means all kinds.
    pub source_kinds: Option<Vec<SourceKind>>,
    /// Case-insensitive substring match on the entry category.
    pub category: Option<String>,
    /// Drop hits strictly below this similarity.
    pub min_similarity: Option<f64>,
}

/// The single authority for corpus entry state.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Nearest-neighbor search over the shared vector space.
    ///
    /// Hits are ordered by similarity descending, ties broken on
    /// `source_id` ascending. Fails with `DimensionMismatch` if the query
    /// vector does not match the corpus dimension.
    async fn search(&self, query: &[f32], top_k: usize, filter: &SearchFilter)
        -> Result<Vec<CorpusHit>>;

    /// Serializable read-modify-write of one entry's confidence.
    ///
    /// Clamps the result to [0, 1] and bumps `updated_at`. Never inserts;
    /// fails with `EntryNotFound` for an absent key.
    async fn adjust_confidence(
        &self,
        kind: SourceKind,
        source_id: &str,
        delta: f64,
        increment_usage: bool,
    ) -> Result<ConfidenceUpdate>;

    /// Increment an entry's usage count. Never inserts.
    async fn bump_usage(&self, kind: SourceKind, source_id: &str) -> Result<()>;

    /// Insert or replace an entry. Enforces the corpus dimension.
    async fn upsert(&self, entry: CorpusEntry) -> Result<()>;

    /// Fetch one entry by key.
    async fn get(&self, kind: SourceKind, source_id: &str) -> Result<Option<CorpusEntry>>;

    /// The embedding dimension this corpus was opened with.
    fn dimension(&self) -> usize;
}

/// Articles and their provenance links.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert_article(&self, article: Article) -> Result<()>;

    async fn get_article(&self, article_id: &str) -> Result<Option<Article>>;

    /// Replace an article's content fields and status in one write.
    async fn update_article(&self, article: Article) -> Result<()>;

    async fn set_status(&self, article_id: &str, status: ArticleStatus) -> Result<()>;

    async fn add_provenance(&self, records: Vec<ProvenanceRecord>) -> Result<()>;

    /// Batched provenance lookup for a set of articles (single query).
    async fn provenance_for(&self, article_ids: &[String]) -> Result<Vec<ProvenanceRecord>>;
}

/// Append-only retrieval audit, mutable only for post-hoc stamping.
#[async_trait]
pub trait RetrievalLogStore: Send + Sync {
    async fn append(&self, rows: Vec<RetrievalLogEntry>) -> Result<()>;

    /// Stamp `case_id` onto rows for this conversation that have none yet.
    /// Returns how many rows were stamped.
    async fn link_case(&self, conversation_id: &str, case_id: &str) -> Result<usize>;

    /// Stamp `outcome` onto rows for this case that have none yet.
    /// Returns how many rows were stamped.
    async fn set_outcomes(&self, case_id: &str, outcome: RetrievalOutcome) -> Result<usize>;

    async fn for_case(&self, case_id: &str) -> Result<Vec<RetrievalLogEntry>>;

    async fn for_conversation(&self, conversation_id: &str) -> Result<Vec<RetrievalLogEntry>>;
}

/// Pipeline execution observability.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn record(&self, record: ExecutionRecord) -> Result<()>;

    async fn list_for_conversation(&self, conversation_id: &str) -> Result<Vec<ExecutionRecord>>;

    async fn list_for_case(&self, case_id: &str) -> Result<Vec<ExecutionRecord>>;
}

/// Learning events and their single finalization.
#[async_trait]
pub trait LearningEventStore: Send + Sync {
    async fn insert_event(&self, event: LearningEvent) -> Result<()>;

    async fn get_event(&self, event_id: &str) -> Result<Option<LearningEvent>>;

    /// Finalize a pending event. Fails with `EventNotFound` or
    /// `AlreadyReviewed`; an event is finalized at most once.
    async fn finalize_event(
        &self,
        event_id: &str,
        status: ReviewStatus,
        reviewer_role: ReviewerRole,
        reason: Option<String>,
    ) -> Result<LearningEvent>;

    /// All events still awaiting review, oldest first.
    async fn pending_events(&self) -> Result<Vec<LearningEvent>>;
}

/// Resolved cases. Loading the closed case is the learning loop's only
/// fatal lookup.
#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn insert_case(&self, case: ResolvedCase) -> Result<()>;

    async fn get_case(&self, case_id: &str) -> Result<Option<ResolvedCase>>;

    /// Single batched lookup for enrichment; unknown ids are simply absent
    /// from the result.
    async fn cases_for(&self, case_ids: &[String]) -> Result<Vec<ResolvedCase>>;
}

/// Read-only view of conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<ConversationRecord>>;
}

/// Read-only script catalog, batch-queried during enrichment.
#[async_trait]
pub trait ScriptCatalog: Send + Sync {
    /// Single batched lookup; unknown ids are simply absent from the result.
    async fn scripts_for(&self, script_ids: &[String]) -> Result<Vec<ScriptMeta>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify traits are object-safe
    #[test]
    fn test_stores_are_object_safe() {
        fn _corpus(_: Box<dyn CorpusStore>) {}
        fn _articles(_: Box<dyn ArticleStore>) {}
        fn _logs(_: Box<dyn RetrievalLogStore>) {}
        fn _events(_: Box<dyn LearningEventStore>) {}
        fn _cases(_: Box<dyn CaseStore>) {}
    }
}
