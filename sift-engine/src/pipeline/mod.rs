//! The retrieval pipeline: two graphs over one state record.
//!
//! Each graph is a list of node references; the runner walks the list,
//! timing every node into the state, and handles the two edges that are
//! not simple successions: the validate -> retrieve retry and the
//! empty-plan short circuit. QA and Gap share everything up to their
//! terminal node.

pub mod enrich;
mod nodes;
pub mod payloads;
pub mod scoring;
mod state;

use std::time::Instant;

use chrono::Utc;
use sift_corpus::{ExecutionRecord, ExecutionStatus, GraphKind, KnowledgeDecision};
use tracing::{info, warn};

pub use enrich::SourceDetail;
pub use payloads::{Citation, QueryVariant};
pub use state::{PipelineRequest, PipelineState};

use crate::text::truncate_chars;
use crate::{EngineContext, Result};

/// A pipeline node reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    PlanQuery,
    Retrieve,
    Rerank,
    EnrichSources,
    WriteAnswer,
    Validate,
    ClassifyKnowledge,
    LogRetrieval,
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlanQuery => "plan_query",
            Self::Retrieve => "retrieve",
            Self::Rerank => "rerank",
            Self::EnrichSources => "enrich_sources",
            Self::WriteAnswer => "write_answer",
            Self::Validate => "validate",
            Self::ClassifyKnowledge => "classify_knowledge",
            Self::LogRetrieval => "log_retrieval",
        }
    }
}

/// Question answering: shared prefix, then answer + validation.
pub const QA_GRAPH: &[Node] = &[
    Node::PlanQuery,
    Node::Retrieve,
    Node::Rerank,
    Node::EnrichSources,
    Node::WriteAnswer,
    Node::Validate,
    Node::LogRetrieval,
];

/// Gap detection: shared prefix, then knowledge classification.
pub const GAP_GRAPH: &[Node] = &[
    Node::PlanQuery,
    Node::Retrieve,
    Node::Rerank,
    Node::EnrichSources,
    Node::ClassifyKnowledge,
    Node::LogRetrieval,
];

/// Graph descriptor for a kind.
pub fn graph_for(kind: GraphKind) -> &'static [Node] {
    match kind {
        GraphKind::Qa => QA_GRAPH,
        GraphKind::Gap => GAP_GRAPH,
    }
}

/// Run a pipeline to completion.
///
/// Fatal errors (embedding failure, classification failure) are returned
/// after an execution record with `status = error` is written; everything
/// softer lands in the state's status and soft-error list.
pub async fn run(ctx: &EngineContext, request: PipelineRequest) -> Result<PipelineState> {
    let mut state = PipelineState::new(request);
    let run_start = Instant::now();

    match walk(ctx, &mut state, run_start).await {
        Ok(()) => {
            info!(
                graph = ?state.graph,
                status = ?state.status,
                evidence = state.evidence.len(),
                attempts = state.attempt_no + 1,
                "pipeline run finished"
            );
            Ok(state)
        }
        Err(e) => {
            state.status = ExecutionStatus::Error;
            state.record_soft_error(format!("fatal: {e}"));
            record_execution(ctx, &mut state, run_start, ExecutionStatus::Error).await;
            Err(e)
        }
    }
}

async fn walk(ctx: &EngineContext, state: &mut PipelineState, run_start: Instant) -> Result<()> {
    let graph = graph_for(state.graph);
    let mut index = 0;

    while index < graph.len() {
        let node = graph[index];
        let node_start = Instant::now();

        match node {
            Node::PlanQuery => {
                nodes::plan_query(ctx, state).await?;
                push_latency(state, node, node_start);
                if state.query_variants.is_empty() {
                    // Nothing to search for: resolve the terminal directly
                    match state.graph {
                        GraphKind::Qa => state.status = ExecutionStatus::InsufficientEvidence,
                        GraphKind::Gap => {
                            state.decision = Some(KnowledgeDecision::no_evidence());
                        }
                    }
                    if let Some(log_index) =
                        graph.iter().position(|n| *n == Node::LogRetrieval)
                    {
                        index = log_index;
                        continue;
                    }
                }
            }
            Node::Retrieve => {
                nodes::retrieve(ctx, state).await?;
                push_latency(state, node, node_start);
            }
            Node::Rerank => {
                if !state.candidates.is_empty() {
                    nodes::rerank(ctx, state).await?;
                    push_latency(state, node, node_start);
                }
            }
            Node::EnrichSources => {
                if !state.candidates.is_empty() {
                    nodes::enrich_sources(ctx, state).await?;
                    push_latency(state, node, node_start);
                }
            }
            Node::WriteAnswer => {
                // Insufficient evidence never reaches the generator
                if !state.evidence.is_empty() {
                    nodes::write_answer(ctx, state).await?;
                    push_latency(state, node, node_start);
                }
            }
            Node::Validate => {
                push_latency(state, node, node_start);
                match nodes::validate(state) {
                    nodes::Validation::Passed => state.status = ExecutionStatus::Ok,
                    nodes::Validation::Retry => {
                        warn!(
                            top_k = state.top_k,
                            "answer validation failed, widening retrieval and retrying"
                        );
                        record_execution(
                            ctx,
                            state,
                            run_start,
                            ExecutionStatus::InsufficientEvidence,
                        )
                        .await;
                        state.attempt_no += 1;
                        state.top_k = (state.top_k as f64 * 1.5).ceil() as usize;
                        state.reset_for_retry();
                        if let Some(retrieve_index) =
                            graph.iter().position(|n| *n == Node::Retrieve)
                        {
                            index = retrieve_index;
                            continue;
                        }
                    }
                    nodes::Validation::Insufficient => {
                        state.status = ExecutionStatus::InsufficientEvidence;
                    }
                }
            }
            Node::ClassifyKnowledge => {
                nodes::classify_knowledge(ctx, state).await?;
                push_latency(state, node, node_start);
                state.status = ExecutionStatus::Ok;
            }
            Node::LogRetrieval => {
                nodes::log_retrieval(ctx, state).await;
                push_latency(state, node, node_start);
                let status = state.status;
                record_execution(ctx, state, run_start, status).await;
            }
        }

        index += 1;
    }

    Ok(())
}

fn push_latency(state: &mut PipelineState, node: Node, start: Instant) {
    state
        .node_latencies
        .push((node.name().to_string(), start.elapsed().as_millis() as u64));
}

/// Emit the per-attempt execution record. Failures are logged and
/// swallowed; observability must never take the pipeline down.
async fn record_execution(
    ctx: &EngineContext,
    state: &mut PipelineState,
    run_start: Instant,
    status: ExecutionStatus,
) {
    let top_similarity = state
        .evidence
        .iter()
        .map(|hit| hit.similarity)
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))));
    let top_rerank_score = state
        .evidence
        .iter()
        .filter_map(|hit| hit.rerank_score)
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))));

    let record = ExecutionRecord {
        execution_id: state.execution_id(),
        graph_kind: state.graph,
        conversation_id: state.conversation_id.clone(),
        case_id: state.case_id.clone(),
        query: truncate_chars(&state.query, 500),
        total_latency_ms: run_start.elapsed().as_millis() as u64,
        node_latencies: state.node_latencies.clone(),
        tokens_in: state.tokens.input,
        tokens_out: state.tokens.output,
        evidence_count: state.evidence.len(),
        top_similarity,
        top_rerank_score,
        classification: state.decision.as_ref().map(|d| d.verdict.to_string()),
        status,
        error_message: if state.soft_errors.is_empty() {
            None
        } else {
            Some(state.soft_errors.join("; "))
        },
        created_at: Utc::now(),
    };

    if let Err(e) = ctx.executions.record(record).await {
        warn!("failed to record execution: {e}");
    }
}
