//! In-memory reference backend.
//!
//! Holds every logical table behind `tokio` locks, with one mutex per
//! corpus row so confidence updates are serializable read-modify-writes.
//! Vector search is exact cosine over the full corpus, which keeps
//! ordering deterministic (similarity descending, `source_id` ascending on
//! ties). Database backends implement the same traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::traits::{
    ArticleStore, CaseStore, ConversationStore, CorpusStore, ExecutionStore, LearningEventStore,
    RetrievalLogStore, ScriptCatalog, SearchFilter,
};
use crate::{
    Article, ArticleStatus, ConfidenceUpdate, ConversationRecord, CorpusEntry, CorpusHit,
    EntryKey, ExecutionRecord, LearningEvent, ProvenanceRecord, ResolvedCase, Result,
    RetrievalLogEntry, RetrievalOutcome, ReviewStatus, ReviewerRole, ScriptMeta, SourceKind,
    StoreError,
};

/// Cosine similarity mapped to [0, 1].
///
/// `1 - cosine_distance` for non-degenerate vectors; zero-norm vectors
/// score 0. Negative cosine is clamped to 0 so scores compose with the
/// blended ranking.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// In-memory store implementing every storage trait.
pub struct MemoryStore {
    dim: usize,
    entries: RwLock<HashMap<EntryKey, Arc<Mutex<CorpusEntry>>>>,
    articles: RwLock<HashMap<String, Article>>,
    provenance: RwLock<Vec<ProvenanceRecord>>,
    logs: RwLock<Vec<RetrievalLogEntry>>,
    executions: RwLock<Vec<ExecutionRecord>>,
    events: RwLock<HashMap<String, LearningEvent>>,
    cases: RwLock<HashMap<String, ResolvedCase>>,
    conversations: RwLock<HashMap<String, ConversationRecord>>,
    scripts: RwLock<HashMap<String, ScriptMeta>>,
}

impl MemoryStore {
    /// Open an empty store pinned to an embedding dimension.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: RwLock::new(HashMap::new()),
            articles: RwLock::new(HashMap::new()),
            provenance: RwLock::new(Vec::new()),
            logs: RwLock::new(Vec::new()),
            executions: RwLock::new(Vec::new()),
            events: RwLock::new(HashMap::new()),
            cases: RwLock::new(HashMap::new()),
            conversations: RwLock::new(HashMap::new()),
            scripts: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a conversation record (ingestion happens outside the core).
    pub async fn insert_conversation(&self, record: ConversationRecord) {
        self.conversations
            .write()
            .await
            .insert(record.conversation_id.clone(), record);
    }

    /// Seed a script-catalog row.
    pub async fn insert_script(&self, meta: ScriptMeta) {
        self.scripts
            .write()
            .await
            .insert(meta.script_id.clone(), meta);
    }

    fn check_dim(&self, len: usize) -> Result<()> {
        if len != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                actual: len,
            });
        }
        Ok(())
    }

    async fn row(&self, kind: SourceKind, source_id: &str) -> Result<Arc<Mutex<CorpusEntry>>> {
        let key = EntryKey::new(kind, source_id);
        self.entries
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or(StoreError::EntryNotFound {
                kind,
                id: source_id.to_string(),
            })
    }
}

#[async_trait]
impl CorpusStore for MemoryStore {
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<CorpusHit>> {
        self.check_dim(query.len())?;

        let category_needle = filter.category.as_ref().map(|c| c.to_lowercase());
        let rows: Vec<Arc<Mutex<CorpusEntry>>> =
            self.entries.read().await.values().cloned().collect();

        let mut hits = Vec::new();
        for row in rows {
            let entry = row.lock().await;

            if let Some(kinds) = &filter.source_kinds {
                if !kinds.contains(&entry.kind) {
                    continue;
                }
            }
            if let Some(needle) = &category_needle {
                let matched = entry
                    .category
                    .as_ref()
                    .is_some_and(|c| c.to_lowercase().contains(needle));
                if !matched {
                    continue;
                }
            }

            let similarity = cosine_similarity(query, &entry.embedding);
            if let Some(min) = filter.min_similarity {
                if similarity < min {
                    continue;
                }
            }
            hits.push(CorpusHit::from_entry(&entry, similarity));
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn adjust_confidence(
        &self,
        kind: SourceKind,
        source_id: &str,
        delta: f64,
        increment_usage: bool,
    ) -> Result<ConfidenceUpdate> {
        let row = self.row(kind, source_id).await?;
        let mut entry = row.lock().await;

        entry.confidence = (entry.confidence + delta).clamp(0.0, 1.0);
        if increment_usage {
            entry.usage_count += 1;
        }
        entry.updated_at = Utc::now();

        Ok(ConfidenceUpdate {
            kind,
            source_id: source_id.to_string(),
            delta,
            new_confidence: entry.confidence,
            new_usage_count: entry.usage_count,
        })
    }

    async fn bump_usage(&self, kind: SourceKind, source_id: &str) -> Result<()> {
        let row = self.row(kind, source_id).await?;
        let mut entry = row.lock().await;
        entry.usage_count += 1;
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert(&self, entry: CorpusEntry) -> Result<()> {
        self.check_dim(entry.embedding.len())?;
        let key = entry.key();
        self.entries
            .write()
            .await
            .insert(key, Arc::new(Mutex::new(entry)));
        Ok(())
    }

    async fn get(&self, kind: SourceKind, source_id: &str) -> Result<Option<CorpusEntry>> {
        let key = EntryKey::new(kind, source_id);
        let row = self.entries.read().await.get(&key).cloned();
        match row {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_article(&self, article: Article) -> Result<()> {
        self.articles
            .write()
            .await
            .insert(article.article_id.clone(), article);
        Ok(())
    }

    async fn get_article(&self, article_id: &str) -> Result<Option<Article>> {
        Ok(self.articles.read().await.get(article_id).cloned())
    }

    async fn update_article(&self, article: Article) -> Result<()> {
        let mut articles = self.articles.write().await;
        if !articles.contains_key(&article.article_id) {
            return Err(StoreError::ArticleNotFound(article.article_id));
        }
        articles.insert(article.article_id.clone(), article);
        Ok(())
    }

    async fn set_status(&self, article_id: &str, status: ArticleStatus) -> Result<()> {
        let mut articles = self.articles.write().await;
        let article = articles
            .get_mut(article_id)
            .ok_or_else(|| StoreError::ArticleNotFound(article_id.to_string()))?;
        article.status = status;
        article.updated_at = Utc::now();
        Ok(())
    }

    async fn add_provenance(&self, records: Vec<ProvenanceRecord>) -> Result<()> {
        self.provenance.write().await.extend(records);
        Ok(())
    }

    async fn provenance_for(&self, article_ids: &[String]) -> Result<Vec<ProvenanceRecord>> {
        let provenance = self.provenance.read().await;
        Ok(provenance
            .iter()
            .filter(|r| article_ids.contains(&r.article_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RetrievalLogStore for MemoryStore {
    async fn append(&self, rows: Vec<RetrievalLogEntry>) -> Result<()> {
        self.logs.write().await.extend(rows);
        Ok(())
    }

    async fn link_case(&self, conversation_id: &str, case_id: &str) -> Result<usize> {
        let mut logs = self.logs.write().await;
        let mut stamped = 0;
        for row in logs.iter_mut() {
            if row.conversation_id.as_deref() == Some(conversation_id) && row.case_id.is_none() {
                row.case_id = Some(case_id.to_string());
                stamped += 1;
            }
        }
        Ok(stamped)
    }

    async fn set_outcomes(&self, case_id: &str, outcome: RetrievalOutcome) -> Result<usize> {
        let mut logs = self.logs.write().await;
        let mut stamped = 0;
        for row in logs.iter_mut() {
            if row.case_id.as_deref() == Some(case_id) && row.outcome.is_none() {
                row.outcome = Some(outcome);
                stamped += 1;
            }
        }
        Ok(stamped)
    }

    async fn for_case(&self, case_id: &str) -> Result<Vec<RetrievalLogEntry>> {
        let logs = self.logs.read().await;
        let mut rows: Vec<RetrievalLogEntry> = logs
            .iter()
            .filter(|r| r.case_id.as_deref() == Some(case_id))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.attempt_no);
        Ok(rows)
    }

    async fn for_conversation(&self, conversation_id: &str) -> Result<Vec<RetrievalLogEntry>> {
        let logs = self.logs.read().await;
        Ok(logs
            .iter()
            .filter(|r| r.conversation_id.as_deref() == Some(conversation_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn record(&self, record: ExecutionRecord) -> Result<()> {
        self.executions.write().await.push(record);
        Ok(())
    }

    async fn list_for_conversation(&self, conversation_id: &str) -> Result<Vec<ExecutionRecord>> {
        let executions = self.executions.read().await;
        Ok(executions
            .iter()
            .filter(|r| r.conversation_id.as_deref() == Some(conversation_id))
            .cloned()
            .collect())
    }

    async fn list_for_case(&self, case_id: &str) -> Result<Vec<ExecutionRecord>> {
        let executions = self.executions.read().await;
        Ok(executions
            .iter()
            .filter(|r| r.case_id.as_deref() == Some(case_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LearningEventStore for MemoryStore {
    async fn insert_event(&self, event: LearningEvent) -> Result<()> {
        self.events
            .write()
            .await
            .insert(event.event_id.clone(), event);
        Ok(())
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<LearningEvent>> {
        Ok(self.events.read().await.get(event_id).cloned())
    }

    async fn finalize_event(
        &self,
        event_id: &str,
        status: ReviewStatus,
        reviewer_role: ReviewerRole,
        reason: Option<String>,
    ) -> Result<LearningEvent> {
        let mut events = self.events.write().await;
        let event = events
            .get_mut(event_id)
            .ok_or_else(|| StoreError::EventNotFound(event_id.to_string()))?;
        if event.final_status.is_some() {
            return Err(StoreError::AlreadyReviewed(event_id.to_string()));
        }
        event.final_status = Some(status);
        event.reviewer_role = reviewer_role;
        event.review_reason = reason;
        event.timestamp = Utc::now();
        Ok(event.clone())
    }

    async fn pending_events(&self) -> Result<Vec<LearningEvent>> {
        let events = self.events.read().await;
        let mut pending: Vec<LearningEvent> = events
            .values()
            .filter(|e| e.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.timestamp);
        Ok(pending)
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn insert_case(&self, case: ResolvedCase) -> Result<()> {
        self.cases
            .write()
            .await
            .insert(case.case_id.clone(), case);
        Ok(())
    }

    async fn get_case(&self, case_id: &str) -> Result<Option<ResolvedCase>> {
        Ok(self.cases.read().await.get(case_id).cloned())
    }

    async fn cases_for(&self, case_ids: &[String]) -> Result<Vec<ResolvedCase>> {
        let cases = self.cases.read().await;
        Ok(case_ids
            .iter()
            .filter_map(|id| cases.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<ConversationRecord>> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .cloned())
    }
}

#[async_trait]
impl ScriptCatalog for MemoryStore {
    async fn scripts_for(&self, script_ids: &[String]) -> Result<Vec<ScriptMeta>> {
        let scripts = self.scripts.read().await;
        Ok(script_ids
            .iter()
            .filter_map(|id| scripts.get(id).cloned())
            .collect())
    }
}
