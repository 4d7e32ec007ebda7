//! The mutable state record shared by every pipeline node.

use std::collections::HashMap;

use sift_corpus::types::ids;
use sift_corpus::{CorpusHit, EntryKey, ExecutionStatus, GraphKind, KnowledgeDecision, SourceKind};
use sift_models::TokenUsage;

use crate::pipeline::enrich::SourceDetail;
use crate::pipeline::payloads::{Citation, QueryVariant};

/// Input to a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub graph: GraphKind,
    pub query: String,
    pub category: Option<String>,
    pub source_kinds: Option<Vec<SourceKind>>,
    pub top_k: usize,
    pub conversation_id: Option<String>,
    pub case_id: Option<String>,
    /// Summary of live-support retrieval outcomes, fed to the gap
    /// classifier for context.
    pub log_summary: Option<String>,
}

impl PipelineRequest {
    pub fn qa(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            graph: GraphKind::Qa,
            query: query.into(),
            category: None,
            source_kinds: None,
            top_k,
            conversation_id: None,
            case_id: None,
            log_summary: None,
        }
    }

    pub fn gap(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            graph: GraphKind::Gap,
            ..Self::qa(query, top_k)
        }
    }
}

/// The single mutable record a run's nodes read and write.
///
/// Nodes are atomic from the state's perspective: every suspension point
/// sits between nodes or inside a provider call, never between writes that
/// must be seen together.
pub struct PipelineState {
    pub graph: GraphKind,
    pub query: String,
    pub category: Option<String>,
    pub source_kinds: Option<Vec<SourceKind>>,
    pub top_k: usize,
    pub conversation_id: Option<String>,
    pub case_id: Option<String>,
    pub log_summary: Option<String>,

    pub query_variants: Vec<QueryVariant>,
    /// Deduplicated candidates keyed by entry; max similarity wins.
    pub candidates: HashMap<EntryKey, CorpusHit>,
    /// Post-rerank evidence, ordered by blended final score.
    pub evidence: Vec<CorpusHit>,
    pub enriched: Vec<SourceDetail>,

    pub answer: Option<String>,
    pub citations: Vec<Citation>,
    pub self_confidence: Option<String>,
    pub decision: Option<KnowledgeDecision>,

    pub attempt_no: u32,
    pub status: ExecutionStatus,
    pub run_id: String,
    pub node_latencies: Vec<(String, u64)>,
    pub tokens: TokenUsage,
    /// Swallowed side-effect failures, surfaced in the execution record.
    pub soft_errors: Vec<String>,
}

impl PipelineState {
    pub fn new(request: PipelineRequest) -> Self {
        Self {
            graph: request.graph,
            query: request.query,
            category: request.category,
            source_kinds: request.source_kinds,
            top_k: request.top_k,
            conversation_id: request.conversation_id,
            case_id: request.case_id,
            log_summary: request.log_summary,
            query_variants: Vec::new(),
            candidates: HashMap::new(),
            evidence: Vec::new(),
            enriched: Vec::new(),
            answer: None,
            citations: Vec::new(),
            self_confidence: None,
            decision: None,
            attempt_no: 0,
            status: ExecutionStatus::Ok,
            run_id: ids::execution_id(),
            node_latencies: Vec::new(),
            tokens: TokenUsage::default(),
            soft_errors: Vec::new(),
        }
    }

    /// The execution id of the current attempt (`<run>-a1`, `<run>-a2`).
    pub fn execution_id(&self) -> String {
        format!("{}-a{}", self.run_id, self.attempt_no + 1)
    }

    /// Reset retrieval products for a retry; planning output is kept.
    pub fn reset_for_retry(&mut self) {
        self.candidates.clear();
        self.evidence.clear();
        self.enriched.clear();
        self.answer = None;
        self.citations.clear();
        self.self_confidence = None;
    }

    pub fn record_soft_error(&mut self, message: impl Into<String>) {
        self.soft_errors.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_reset_keeps_plan_and_widens_nothing() {
        let mut state = PipelineState::new(PipelineRequest::qa("q", 5));
        state.query_variants.push(QueryVariant {
            query: "variant".into(),
            rationale: "r".into(),
        });
        state.answer = Some("a".into());
        state.attempt_no = 1;

        state.reset_for_retry();
        assert_eq!(state.query_variants.len(), 1);
        assert!(state.answer.is_none());
        assert!(state.candidates.is_empty());
    }

    #[test]
    fn test_execution_ids_share_the_run_prefix() {
        let mut state = PipelineState::new(PipelineRequest::qa("q", 5));
        let first = state.execution_id();
        state.attempt_no = 1;
        let second = state.execution_id();
        assert!(first.ends_with("-a1"));
        assert!(second.ends_with("-a2"));
        assert_eq!(first.trim_end_matches("1"), second.trim_end_matches("2"));
    }
}
