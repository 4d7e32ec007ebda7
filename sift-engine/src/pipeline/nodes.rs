//! Node functions for the retrieval pipeline.
//!
//! Each node takes the shared context and the run's state record, mutates
//! the state, and returns. Error policy is per node: embedding and
//! classification failures are fatal to the run; reranking, enrichment,
//! answer-writing, and logging degrade without failing the run.

use std::collections::hash_map::Entry;

use chrono::Utc;
use sift_corpus::types::ids;
use sift_corpus::{
    CorpusHit, KnowledgeDecision, RetrievalLogEntry, SearchFilter, SourceKind, Verdict,
};
use sift_models::{generate_as, ChatMessage};
use tracing::{debug, warn};

use crate::pipeline::payloads::{
    knowledge_decision_schema, retrieval_plan_schema, support_answer_schema, ClassifierDecision,
    RetrievalPlan, SupportAnswer,
};
use crate::pipeline::state::PipelineState;
use crate::pipeline::{enrich, scoring};
use crate::text::truncate_chars;
use crate::{EngineContext, Result};

/// Generate 2-4 query variants that paraphrase the question across the
/// corpus's terminology.
pub(crate) async fn plan_query(ctx: &EngineContext, state: &mut PipelineState) -> Result<()> {
    let messages = [
        ChatMessage::system(crate::prompts::PLAN_QUERY_SYSTEM),
        ChatMessage::user(format!("Question: {}", state.query)),
    ];

    let (plan, usage) = generate_as::<RetrievalPlan>(
        ctx.generator.as_ref(),
        &messages,
        &retrieval_plan_schema(),
        0.0,
        ctx.config.max_schema_retries,
    )
    .await?;

    state.tokens += usage;
    state.query_variants = plan.queries.into_iter().take(4).collect();
    debug!(variants = state.query_variants.len(), "planned retrieval queries");
    Ok(())
}

/// Embed all variants in one batch, search per variant, and merge into the
/// deduplicated candidate map (max similarity wins).
pub(crate) async fn retrieve(ctx: &EngineContext, state: &mut PipelineState) -> Result<()> {
    let queries: Vec<String> = state.query_variants.iter().map(|v| v.query.clone()).collect();
    if queries.is_empty() {
        return Ok(());
    }

    // One embedding call per retrieval, covering every variant
    let embeddings = ctx.embedder.embed_batch(&queries).await?;

    let per_query_k = state.top_k.max(ctx.config.per_query_floor);
    let filter = SearchFilter {
        source_kinds: state.source_kinds.clone(),
        category: state.category.clone(),
        min_similarity: None,
    };

    let mut result_sets = Vec::with_capacity(embeddings.len());
    for embedding in &embeddings {
        result_sets.push(ctx.corpus.search(embedding, per_query_k, &filter).await?);
    }

    // A category filter that matches nothing falls back to an unfiltered
    // pass, so narrow categories never blank out retrieval entirely.
    let total: usize = result_sets.iter().map(Vec::len).sum();
    if total == 0 && state.category.is_some() {
        let unfiltered = SearchFilter {
            category: None,
            ..filter
        };
        result_sets.clear();
        for embedding in &embeddings {
            result_sets.push(ctx.corpus.search(embedding, per_query_k, &unfiltered).await?);
        }
    }

    for rows in result_sets {
        for hit in rows {
            match state.candidates.entry(hit.key()) {
                Entry::Occupied(mut slot) => {
                    if hit.similarity > slot.get().similarity {
                        slot.insert(hit);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(hit);
                }
            }
        }
    }

    // Cap the merged set, keeping the top similarities
    if state.candidates.len() > ctx.config.max_candidates {
        let mut hits: Vec<CorpusHit> = state.candidates.drain().map(|(_, hit)| hit).collect();
        sort_by_similarity(&mut hits);
        hits.truncate(ctx.config.max_candidates);
        state.candidates = hits.into_iter().map(|hit| (hit.key(), hit)).collect();
    }

    debug!(candidates = state.candidates.len(), "merged retrieval candidates");
    Ok(())
}

fn sort_by_similarity(hits: &mut [CorpusHit]) {
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });
}

/// Rerank candidates (when a reranker is configured and healthy), then
/// apply the blended user-facing score and truncate to the evidence list.
pub(crate) async fn rerank(ctx: &EngineContext, state: &mut PipelineState) -> Result<()> {
    if state.candidates.is_empty() {
        state.evidence.clear();
        return Ok(());
    }

    let mut ordered: Vec<CorpusHit> = state.candidates.values().cloned().collect();
    sort_by_similarity(&mut ordered);

    if ctx.config.reranker_enabled {
        if let Some(reranker) = &ctx.reranker {
            let documents: Vec<String> = ordered.iter().map(|hit| hit.content.clone()).collect();
            match reranker.rerank(&state.query, &documents, state.top_k).await {
                Ok(ranked) => {
                    let mut reranked = Vec::with_capacity(ranked.len());
                    for row in ranked {
                        if let Some(hit) = ordered.get(row.index) {
                            let mut hit = hit.clone();
                            hit.rerank_score = Some(row.relevance_score);
                            reranked.push(hit);
                        }
                    }
                    if !reranked.is_empty() {
                        ordered = reranked;
                    }
                }
                Err(e) => {
                    // Degraded mode: keep similarity order
                    warn!("rerank failed, falling back to similarity order: {e}");
                    state.record_soft_error(format!("rerank_failed: {e}"));
                }
            }
        }
    }

    ordered.truncate(state.top_k);
    scoring::rank_evidence(&mut ordered, Utc::now(), &ctx.config);
    state.evidence = ordered;
    Ok(())
}

/// Attach provenance and ancillary metadata. Never fails the run.
pub(crate) async fn enrich_sources(ctx: &EngineContext, state: &mut PipelineState) -> Result<()> {
    state.enriched = enrich::resolve(ctx, &state.evidence).await;
    Ok(())
}

/// Generate the cited answer. Generation failure is soft: validation will
/// widen and retry, then report insufficient evidence.
pub(crate) async fn write_answer(ctx: &EngineContext, state: &mut PipelineState) -> Result<()> {
    let mut evidence_text = String::new();
    for (i, hit) in state.evidence.iter().enumerate() {
        evidence_text.push_str(&format!(
            "\n[{}] ({}: {}, \"{}\"):\n{}\n",
            i + 1,
            hit.kind,
            hit.source_id,
            hit.title,
            hit.content,
        ));
    }

    let mut enrichment_text = String::new();
    for detail in &state.enriched {
        let lines = detail.prompt_lines();
        if !lines.is_empty() {
            enrichment_text
                .push_str(&format!("\nEnrichment for {}: {}\n", detail.source_id, lines.join("; ")));
        }
    }

    let messages = [
        ChatMessage::system(crate::prompts::WRITE_ANSWER_SYSTEM),
        ChatMessage::user(format!(
            "Question: {}\n\nEvidence:\n{}\n{}\nProvide a comprehensive answer with citations.",
            state.query, evidence_text, enrichment_text,
        )),
    ];

    match generate_as::<SupportAnswer>(
        ctx.generator.as_ref(),
        &messages,
        &support_answer_schema(),
        0.3,
        ctx.config.max_schema_retries,
    )
    .await
    {
        Ok((answer, usage)) => {
            state.tokens += usage;
            state.answer = Some(answer.answer);
            state.citations = answer.citations;
            state.self_confidence = answer.self_confidence;
        }
        Err(e) => {
            warn!("answer generation failed, leaving answer empty: {e}");
            state.record_soft_error(format!("write_answer_failed: {e}"));
        }
    }
    Ok(())
}

/// Outcome of the validation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Validation {
    Passed,
    /// Widen top_k and re-enter retrieval; query planning is not re-run.
    Retry,
    Insufficient,
}

/// Require at least one evidence hit and one citation.
pub(crate) fn validate(state: &PipelineState) -> Validation {
    if !state.evidence.is_empty() && !state.citations.is_empty() {
        Validation::Passed
    } else if state.attempt_no == 0 {
        Validation::Retry
    } else {
        Validation::Insufficient
    }
}

/// Classify the case's knowledge against the retrieved evidence.
///
/// Failure here is fatal to the gap run. The similarity floor is applied
/// after the model call: a best hit below the configured threshold always
/// yields new knowledge, whatever the classifier said.
pub(crate) async fn classify_knowledge(
    ctx: &EngineContext,
    state: &mut PipelineState,
) -> Result<()> {
    if state.evidence.is_empty() {
        state.decision = Some(KnowledgeDecision::no_evidence());
        return Ok(());
    }

    let best_similarity = state.evidence[0].similarity;
    let threshold = ctx.config.gap_similarity_threshold;

    let evidence_summary: Vec<String> = state
        .evidence
        .iter()
        .take(5)
        .map(|hit| {
            format!(
                "- [{}: {}] (similarity={:.3}): {}",
                hit.kind,
                hit.source_id,
                hit.similarity,
                truncate_chars(&hit.content, 300),
            )
        })
        .collect();

    let log_context = state
        .log_summary
        .as_ref()
        .map(|summary| format!("\nRetrieval log from live support:\n{summary}\n"))
        .unwrap_or_default();

    let messages = [
        ChatMessage::system(crate::prompts::CLASSIFY_KNOWLEDGE_SYSTEM),
        ChatMessage::user(format!(
            "Case query: {}\n\nBest similarity score: {:.3}\nSimilarity threshold: {}\n\n\
             Top matching corpus entries:\n{}\n{}\nClassify this case's knowledge.",
            state.query,
            best_similarity,
            threshold,
            evidence_summary.join("\n"),
            log_context,
        )),
    ];

    let (classified, usage) = generate_as::<ClassifierDecision>(
        ctx.generator.as_ref(),
        &messages,
        &knowledge_decision_schema(),
        0.0,
        ctx.config.max_schema_retries,
    )
    .await?;
    state.tokens += usage;

    let mut verdict = classified.verdict;
    let mut reasoning = classified.reasoning;
    if best_similarity < threshold && verdict != Verdict::New {
        reasoning = format!(
            "Best match similarity {best_similarity:.3} is below the {threshold:.2} threshold; \
             treating as new knowledge. Classifier reasoning: {reasoning}"
        );
        verdict = Verdict::New;
    }

    let best = &state.evidence[0];
    state.decision = Some(KnowledgeDecision {
        verdict,
        reasoning,
        best_match_source_id: Some(best.source_id.clone()),
        best_match_source_kind: Some(best.kind),
        similarity_score: best_similarity,
    });
    Ok(())
}

/// Write one log row per evidence hit and bump usage on the top five.
/// Logging never fails the run; failures are kept for the execution record.
pub(crate) async fn log_retrieval(ctx: &EngineContext, state: &mut PipelineState) {
    let execution_id = state.execution_id();

    // Rows are only meaningful when they can later be linked to a case
    if state.conversation_id.is_some() || state.case_id.is_some() {
        let rows: Vec<RetrievalLogEntry> = state
            .evidence
            .iter()
            .take(10)
            .map(|hit| RetrievalLogEntry {
                log_id: ids::retrieval_id(),
                case_id: state.case_id.clone(),
                conversation_id: state.conversation_id.clone(),
                attempt_no: state.attempt_no + 1,
                query_text: truncate_chars(&state.query, 500),
                source_kind: Some(hit.kind),
                source_id: Some(hit.source_id.clone()),
                similarity_score: Some(hit.similarity),
                outcome: None,
                execution_id: Some(execution_id.clone()),
                created_at: Utc::now(),
            })
            .collect();

        if !rows.is_empty() {
            if let Err(e) = ctx.logs.append(rows).await {
                warn!("failed to write retrieval log rows: {e}");
                state.record_soft_error(format!("retrieval_log_failed: {e}"));
            }
        }
    }

    let top: Vec<(SourceKind, String)> = state
        .evidence
        .iter()
        .take(5)
        .map(|hit| (hit.kind, hit.source_id.clone()))
        .collect();
    for (kind, source_id) in top {
        if let Err(e) = ctx.corpus.bump_usage(kind, &source_id).await {
            warn!("failed to bump usage for {kind}:{source_id}: {e}");
            state.record_soft_error(format!("usage_bump_failed: {kind}:{source_id}: {e}"));
        }
    }
}
