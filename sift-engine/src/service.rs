//! The public facade: suggest, close_case, learn, review.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sift_corpus::types::ids;
use sift_corpus::{
    CorpusHit, ExecutionStatus, GraphKind, LearningEvent, ResolvedCase, ReviewStatus,
    ReviewerRole, SourceKind,
};
use tracing::warn;

use crate::learning::LearningOutcome;
use crate::pipeline::{self, Citation, PipelineRequest, SourceDetail};
use crate::{learning, review, EngineContext, EngineError, Result};

/// Optional filters for a suggestion request.
#[derive(Debug, Clone, Default)]
pub struct SuggestOptions {
    pub category: Option<String>,
    pub source_kinds: Option<Vec<SourceKind>>,
    pub top_k: Option<usize>,
}

/// Evidence-backed suggestion for a live conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_confidence: Option<String>,
    pub citations: Vec<Citation>,
    /// Evidence in blended-score order; `final_score` is the public
    /// confidence.
    pub evidence: Vec<CorpusHit>,
    pub sources: Vec<SourceDetail>,
    pub retrieval_queries: Vec<String>,
    pub execution_id: String,
}

/// Resolved-case fields supplied when an agent closes a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseClosure {
    pub subject: String,
    pub description: String,
    pub resolution: String,
    pub root_cause: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub script_id: Option<String>,
    /// Whether the conversation closed as resolved. Drives outcome
    /// stamping on the linked retrieval logs.
    pub resolved: bool,
}

/// Result of closing a case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseClosed {
    pub case_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning: Option<LearningOutcome>,
    pub warnings: Vec<String>,
}

/// The support-intelligence engine.
///
/// Owns the shared context; each operation is a single logical task and
/// any number of them may run concurrently.
pub struct SupportEngine {
    ctx: Arc<EngineContext>,
}

impl SupportEngine {
    /// Validate configuration and cross-check the embedding dimension
    /// against both the corpus store and the embedding port.
    pub fn new(ctx: EngineContext) -> Result<Self> {
        ctx.config.validate()?;

        let dim = ctx.config.embedding_dim;
        if ctx.corpus.dimension() != dim {
            return Err(EngineError::InvalidConfig(format!(
                "corpus dimension {} does not match configured embedding_dim {dim}",
                ctx.corpus.dimension(),
            )));
        }
        if ctx.embedder.dimension() != dim {
            return Err(EngineError::InvalidConfig(format!(
                "embedding provider dimension {} does not match configured embedding_dim {dim}",
                ctx.embedder.dimension(),
            )));
        }

        Ok(Self { ctx: Arc::new(ctx) })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Retrieve evidence and a cited answer for a live conversation.
    pub async fn suggest(
        &self,
        conversation_id: &str,
        query: &str,
        options: SuggestOptions,
    ) -> Result<Suggestion> {
        let top_k = match options.top_k {
            Some(0) => return Err(EngineError::InvalidRequest("top_k must be > 0".into())),
            Some(k) => k,
            None => self.ctx.config.default_top_k,
        };

        let request = PipelineRequest {
            graph: GraphKind::Qa,
            query: query.to_string(),
            category: options.category,
            source_kinds: options.source_kinds,
            top_k,
            conversation_id: Some(conversation_id.to_string()),
            case_id: None,
            log_summary: None,
        };

        let state = pipeline::run(&self.ctx, request).await?;
        let execution_id = state.execution_id();
        let retrieval_queries = state
            .query_variants
            .iter()
            .map(|v| v.query.clone())
            .collect();
        Ok(Suggestion {
            status: state.status,
            answer: state.answer,
            self_confidence: state.self_confidence,
            citations: state.citations,
            evidence: state.evidence,
            sources: state.enriched,
            retrieval_queries,
            execution_id,
        })
    }

    /// Close a conversation: persist the resolved case, then run the
    /// learning loop. Only failing to persist the case is fatal; learning
    /// failures surface as warnings.
    pub async fn close_case(
        &self,
        conversation_id: &str,
        closure: CaseClosure,
    ) -> Result<CaseClosed> {
        let case = ResolvedCase {
            case_id: ids::case_id(),
            conversation_id: conversation_id.to_string(),
            subject: closure.subject,
            description: closure.description,
            resolution: closure.resolution,
            root_cause: closure.root_cause,
            category: closure.category,
            tags: closure.tags,
            script_id: closure.script_id,
            closed_at: Utc::now(),
        };
        let case_id = case.case_id.clone();

        self.ctx
            .cases
            .insert_case(case)
            .await
            .map_err(EngineError::from_store)?;

        match learning::run(&self.ctx, &case_id, closure.resolved).await {
            Ok(outcome) => {
                let warnings = outcome.warnings.clone();
                Ok(CaseClosed {
                    case_id,
                    learning: Some(outcome),
                    warnings,
                })
            }
            Err(e) => {
                warn!(case_id = %case_id, "learning pipeline failed at close: {e}");
                Ok(CaseClosed {
                    case_id,
                    learning: None,
                    warnings: vec![format!("learning_failed: {e}")],
                })
            }
        }
    }

    /// Run the learning loop for an already-persisted case, treating it as
    /// resolved.
    pub async fn learn(&self, case_id: &str) -> Result<LearningOutcome> {
        learning::run(&self.ctx, case_id, true).await
    }

    /// Run the learning loop with an explicit resolution outcome.
    pub async fn learn_with_outcome(
        &self,
        case_id: &str,
        resolved: bool,
    ) -> Result<LearningOutcome> {
        learning::run(&self.ctx, case_id, resolved).await
    }

    /// Apply a reviewer's decision to a pending learning event.
    pub async fn review(
        &self,
        event_id: &str,
        decision: ReviewStatus,
        reviewer_role: ReviewerRole,
        reason: Option<String>,
    ) -> Result<LearningEvent> {
        review::apply_review(&self.ctx, event_id, decision, reviewer_role, reason).await
    }
}
