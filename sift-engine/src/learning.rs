//! The self-learning coordinator.
//!
//! Runs at case closure, synchronously: link live-support retrieval logs
//! to the case, stamp outcomes, adjust corpus confidence, run gap
//! detection, and act on the verdict. Every stage except loading the case
//! itself is best-effort; failures accumulate into the returned warnings.

use std::collections::BTreeMap;

use serde::Serialize;
use sift_corpus::{
    ConfidenceUpdate, EventKind, KnowledgeDecision, LearningEvent, ProvenanceRecord,
    ProvenanceSource, Relationship, ResolvedCase, RetrievalLogEntry, RetrievalOutcome, SourceKind,
    Verdict,
};
use tracing::{info, warn};

use crate::pipeline::{self, PipelineRequest};
use crate::text::truncate_chars;
use crate::{draft, EngineContext, EngineError, Result};

/// Aggregate result of one coordinator run.
#[derive(Debug, Clone, Serialize)]
pub struct LearningOutcome {
    pub case_id: String,
    pub retrieval_logs_processed: usize,
    pub confidence_updates: Vec<ConfidenceUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drafted_article_id: Option<String>,
    pub warnings: Vec<String>,
}

/// Run the full learning sequence for a closed case.
///
/// The only fatal error is failing to load the case.
pub async fn run(ctx: &EngineContext, case_id: &str, resolved: bool) -> Result<LearningOutcome> {
    let case = ctx
        .cases
        .get_case(case_id)
        .await
        .map_err(EngineError::from_store)?
        .ok_or_else(|| EngineError::CaseNotFound(case_id.to_string()))?;

    let mut warnings: Vec<String> = Vec::new();

    // Stage 1: link pre-case logs, then stamp outcomes
    match ctx.logs.link_case(&case.conversation_id, case_id).await {
        Ok(linked) => info!(case_id, linked, "linked retrieval logs to case"),
        Err(e) => warnings.push(format!("log_linkage_failed: {e}")),
    }

    let outcome = if resolved {
        RetrievalOutcome::Resolved
    } else {
        RetrievalOutcome::Unhelpful
    };
    if let Err(e) = ctx.logs.set_outcomes(case_id, outcome).await {
        warnings.push(format!("outcome_stamping_failed: {e}"));
    }

    // Stage 2: score outcomes into corpus confidence
    let rows = match ctx.logs.for_case(case_id).await {
        Ok(rows) => rows,
        Err(e) => {
            warnings.push(format!("log_fetch_failed: {e}"));
            Vec::new()
        }
    };
    let confidence_updates = update_confidence(ctx, &rows, &mut warnings).await;
    let log_summary = build_log_summary(&rows);

    // Stage 3: fresh gap detection against the case's resolution
    let request = PipelineRequest {
        graph: sift_corpus::GraphKind::Gap,
        query: gap_query(&case),
        category: case.category.clone(),
        source_kinds: None,
        top_k: ctx.config.default_top_k,
        conversation_id: Some(case.conversation_id.clone()),
        case_id: Some(case_id.to_string()),
        log_summary,
    };

    let decision = match pipeline::run(ctx, request).await {
        Ok(state) => state.decision,
        Err(e) => {
            warnings.push(format!("gap_detection_failed: {e}"));
            None
        }
    };

    let mut outcome = LearningOutcome {
        case_id: case_id.to_string(),
        retrieval_logs_processed: rows.len(),
        confidence_updates,
        verdict: decision.as_ref().map(|d| d.verdict),
        matched_source_id: decision.as_ref().and_then(|d| d.best_match_source_id.clone()),
        match_similarity: decision.as_ref().map(|d| d.similarity_score),
        learning_event_id: None,
        drafted_article_id: None,
        warnings,
    };

    // Stage 4: act on the verdict
    if let Some(decision) = decision {
        act_on_verdict(ctx, &case, &decision, &rows, &mut outcome).await;
    }

    info!(
        case_id,
        verdict = ?outcome.verdict,
        updates = outcome.confidence_updates.len(),
        warnings = outcome.warnings.len(),
        "learning pipeline finished"
    );
    Ok(outcome)
}

/// Adjust corpus confidence for each stamped log row. Row failures do not
/// stop the batch; each row update is independent and atomic in the store.
async fn update_confidence(
    ctx: &EngineContext,
    rows: &[RetrievalLogEntry],
    warnings: &mut Vec<String>,
) -> Vec<ConfidenceUpdate> {
    let mut updates = Vec::new();

    for row in rows {
        let (Some(kind), Some(source_id), Some(outcome)) =
            (row.source_kind, row.source_id.as_ref(), row.outcome)
        else {
            continue;
        };

        let (delta, increment_usage) = match outcome {
            RetrievalOutcome::Resolved => (ctx.config.confidence_delta_resolved, true),
            RetrievalOutcome::Partial => (ctx.config.confidence_delta_partial, false),
            RetrievalOutcome::Unhelpful => (ctx.config.confidence_delta_unhelpful, false),
        };

        match ctx
            .corpus
            .adjust_confidence(kind, source_id, delta, increment_usage)
            .await
        {
            Ok(update) => updates.push(update),
            Err(e) => warnings.push(format!("confidence_update_failed: {kind}:{source_id}: {e}")),
        }
    }

    updates
}

/// Build the gap-detection query from the case's outcome fields, in the
/// fixed subject / root-cause / category / resolution order.
fn gap_query(case: &ResolvedCase) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !case.subject.is_empty() {
        parts.push(case.subject.clone());
    }
    if !case.root_cause.is_empty() {
        parts.push(case.root_cause.clone());
    }
    if let Some(category) = &case.category {
        if !category.is_empty() {
            parts.push(category.clone());
        }
    }
    if !case.resolution.is_empty() {
        parts.push(format!("Resolution: {}", truncate_chars(&case.resolution, 200)));
    }

    if parts.is_empty() {
        truncate_chars(&case.description, 300)
    } else {
        parts.join(". ")
    }
}

/// Summarize live-support retrieval outcomes for the classifier prompt.
fn build_log_summary(rows: &[RetrievalLogEntry]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        if let Some(outcome) = row.outcome {
            *counts.entry(outcome.to_string()).or_default() += 1;
        }
    }
    if counts.is_empty() {
        return Some(format!("{} retrieval attempts, no outcomes recorded yet.", rows.len()));
    }

    let parts: Vec<String> = counts
        .iter()
        .map(|(outcome, count)| format!("{count} {outcome}"))
        .collect();
    let mut queries: Vec<String> = Vec::new();
    for row in rows.iter().take(5) {
        if !queries.contains(&row.query_text) {
            queries.push(row.query_text.clone());
        }
    }

    Some(format!(
        "{} retrieval attempts during live support: {}. Queries: {}",
        rows.len(),
        parts.join(", "),
        queries.join("; "),
    ))
}

/// Describe the detected gap for the learning event record.
fn gap_description(rows: &[RetrievalLogEntry]) -> String {
    if rows.is_empty() {
        return "No retrieval attempts were made during support. Knowledge gap detected via \
                post-close analysis."
            .to_string();
    }
    let mut queries: Vec<String> = Vec::new();
    for row in rows {
        if !queries.contains(&row.query_text) {
            queries.push(row.query_text.clone());
        }
    }
    format!(
        "{} retrieval attempts during support. Queries: {}",
        rows.len(),
        queries.into_iter().take(5).collect::<Vec<_>>().join("; "),
    )
}

async fn act_on_verdict(
    ctx: &EngineContext,
    case: &ResolvedCase,
    decision: &KnowledgeDecision,
    rows: &[RetrievalLogEntry],
    outcome: &mut LearningOutcome,
) {
    match decision.verdict {
        Verdict::Same => confirm_knowledge(ctx, case, decision, outcome).await,
        Verdict::New => {
            let transcript = load_transcript(ctx, case, &mut outcome.warnings).await;
            match draft::draft_new_article(ctx, case, transcript.as_deref(), rows).await {
                Ok(article) => {
                    let event = LearningEvent::pending(
                        EventKind::Gap,
                        &case.case_id,
                        gap_description(rows),
                        article.title.clone(),
                    )
                    .with_proposed_article(&article.article_id);
                    store_event(ctx, event, outcome).await;
                    outcome.drafted_article_id = Some(article.article_id);
                }
                Err(e) => outcome.warnings.push(format!("draft_failed: {e}")),
            }
        }
        Verdict::Contradicts => contradict_knowledge(ctx, case, decision, rows, outcome).await,
    }
}

/// SAME_KNOWLEDGE: auto-approved confirmation event, confidence boost on
/// the confirmed entry, and a provenance link when that entry is an
/// article. No draft is produced.
async fn confirm_knowledge(
    ctx: &EngineContext,
    case: &ResolvedCase,
    decision: &KnowledgeDecision,
    outcome: &mut LearningOutcome,
) {
    let best_id = decision.best_match_source_id.clone().unwrap_or_default();
    let event = LearningEvent::confirmed(
        &case.case_id,
        format!(
            "Knowledge confirmed: existing corpus entry {} (similarity={:.3}) covers this \
             case's resolution.",
            best_id, decision.similarity_score,
        ),
        format!("Existing knowledge validated by case {}", case.case_id),
    );
    store_event(ctx, event, outcome).await;

    let Some(kind) = decision.best_match_source_kind else {
        return;
    };
    if best_id.is_empty() {
        return;
    }

    if let Err(e) = ctx
        .corpus
        .adjust_confidence(kind, &best_id, ctx.config.confidence_delta_confirmed, true)
        .await
    {
        outcome
            .warnings
            .push(format!("confidence_update_failed: {kind}:{best_id}: {e}"));
    }

    if kind == SourceKind::Article {
        let link = ProvenanceRecord::new(
            best_id.clone(),
            ProvenanceSource::Case,
            case.case_id.clone(),
            Relationship::References,
            format!(
                "Case {} resolution confirmed existing knowledge (similarity={:.3})",
                case.case_id, decision.similarity_score,
            ),
        );
        if let Err(e) = ctx.articles.add_provenance(vec![link]).await {
            outcome.warnings.push(format!("provenance_link_failed: {e}"));
        }
    }
}

/// CONTRADICTS: draft a replacement, flag the contradicted entry, and
/// leave both pending review.
async fn contradict_knowledge(
    ctx: &EngineContext,
    case: &ResolvedCase,
    decision: &KnowledgeDecision,
    rows: &[RetrievalLogEntry],
    outcome: &mut LearningOutcome,
) {
    let flagged_id = decision.best_match_source_id.clone().unwrap_or_default();

    let flagged_article = if decision.best_match_source_kind == Some(SourceKind::Article) {
        match ctx.articles.get_article(&flagged_id).await {
            Ok(article) => article,
            Err(e) => {
                outcome.warnings.push(format!("flagged_article_fetch_failed: {e}"));
                None
            }
        }
    } else {
        None
    };

    let transcript = load_transcript(ctx, case, &mut outcome.warnings).await;
    let drafted = match &flagged_article {
        Some(flagged) => {
            draft::draft_replacement_article(ctx, case, transcript.as_deref(), rows, flagged).await
        }
        None => draft::draft_new_article(ctx, case, transcript.as_deref(), rows).await,
    };

    match drafted {
        Ok(article) => {
            let event = LearningEvent::pending(
                EventKind::Contradiction,
                &case.case_id,
                format!(
                    "Contradiction detected: case resolution differs from existing entry {} \
                     (similarity={:.3}). Reason: {}",
                    flagged_id, decision.similarity_score, decision.reasoning,
                ),
                article.title.clone(),
            )
            .with_proposed_article(&article.article_id)
            .with_flagged_article(&flagged_id);
            store_event(ctx, event, outcome).await;
            outcome.drafted_article_id = Some(article.article_id);
        }
        Err(e) => outcome.warnings.push(format!("draft_failed: {e}")),
    }
}

async fn store_event(ctx: &EngineContext, event: LearningEvent, outcome: &mut LearningOutcome) {
    let event_id = event.event_id.clone();
    match ctx.events.insert_event(event).await {
        Ok(()) => outcome.learning_event_id = Some(event_id),
        Err(e) => outcome.warnings.push(format!("event_insert_failed: {e}")),
    }
}

async fn load_transcript(
    ctx: &EngineContext,
    case: &ResolvedCase,
    warnings: &mut Vec<String>,
) -> Option<String> {
    match ctx.conversations.get_conversation(&case.conversation_id).await {
        Ok(Some(record)) => Some(record.transcript),
        Ok(None) => None,
        Err(e) => {
            warn!("failed to load conversation transcript: {e}");
            warnings.push(format!("transcript_fetch_failed: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn case() -> ResolvedCase {
        ResolvedCase {
            case_id: "CASE-1".into(),
            conversation_id: "CONV-1".into(),
            subject: "Voucher file rejected".into(),
            description: "The monthly voucher file fails to submit".into(),
            resolution: "Regenerated the file after fixing the unit record".into(),
            root_cause: "Stale unit status".into(),
            category: Some("HAP / Voucher Processing".into()),
            tags: vec![],
            script_id: None,
            closed_at: Utc::now(),
        }
    }

    fn log_row(query: &str, outcome: Option<RetrievalOutcome>) -> RetrievalLogEntry {
        RetrievalLogEntry {
            log_id: "RET-1".into(),
            case_id: Some("CASE-1".into()),
            conversation_id: Some("CONV-1".into()),
            attempt_no: 1,
            query_text: query.into(),
            source_kind: Some(SourceKind::Script),
            source_id: Some("SCR-1".into()),
            similarity_score: Some(0.8),
            outcome,
            execution_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_gap_query_concatenates_in_order() {
        let query = gap_query(&case());
        let subject_at = query.find("Voucher file rejected").unwrap();
        let root_cause_at = query.find("Stale unit status").unwrap();
        let category_at = query.find("HAP / Voucher Processing").unwrap();
        let resolution_at = query.find("Resolution: Regenerated").unwrap();
        assert!(subject_at < root_cause_at);
        assert!(root_cause_at < category_at);
        assert!(category_at < resolution_at);
    }

    #[test]
    fn test_gap_query_falls_back_to_description() {
        let mut empty = case();
        empty.subject.clear();
        empty.root_cause.clear();
        empty.category = None;
        empty.resolution.clear();
        assert_eq!(gap_query(&empty), "The monthly voucher file fails to submit");
    }

    #[test]
    fn test_log_summary_counts_outcomes() {
        let rows = vec![
            log_row("q1", Some(RetrievalOutcome::Resolved)),
            log_row("q2", Some(RetrievalOutcome::Resolved)),
            log_row("q3", Some(RetrievalOutcome::Partial)),
        ];
        let summary = build_log_summary(&rows).unwrap();
        assert!(summary.contains("3 retrieval attempts"));
        assert!(summary.contains("2 RESOLVED"));
        assert!(summary.contains("1 PARTIAL"));
        assert!(summary.contains("q1; q2; q3"));
    }

    #[test]
    fn test_log_summary_without_outcomes() {
        let rows = vec![log_row("q1", None)];
        let summary = build_log_summary(&rows).unwrap();
        assert!(summary.contains("no outcomes recorded yet"));
        assert!(build_log_summary(&[]).is_none());
    }

    #[test]
    fn test_gap_description_mentions_queries() {
        let rows = vec![log_row("advance date", None), log_row("advance date", None)];
        let text = gap_description(&rows);
        assert!(text.contains("2 retrieval attempts"));
        assert!(text.contains("advance date"));
        assert!(gap_description(&[]).contains("No retrieval attempts"));
    }
}
