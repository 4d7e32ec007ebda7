//! Draft generation: turn a resolved case into a reviewable article.
//!
//! The only place in the system with non-zero sampling temperature. Drafts
//! are persisted as `DRAFT`/`SYNTHESIZED` articles with their three
//! provenance links; they enter the corpus only if a reviewer approves.

use serde::Deserialize;
use serde_json::json;
use sift_corpus::{
    Article, ProvenanceRecord, ProvenanceSource, Relationship, ResolvedCase, RetrievalLogEntry,
};
use sift_models::{generate_as, ChatMessage, OutputSchema};
use tracing::info;

use crate::text::truncate_chars;
use crate::{EngineContext, Result};

/// Sampling temperature for drafting.
const DRAFT_TEMPERATURE: f32 = 0.4;

/// Structured output the generator returns when drafting an article.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleDraftPayload {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub related_error_codes: Vec<String>,
    #[serde(default)]
    pub resolution_steps: Vec<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
}

fn article_draft_schema() -> OutputSchema {
    OutputSchema::new(
        "article_draft",
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "body": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "module": {"type": ["string", "null"]},
                "category": {"type": ["string", "null"]},
                "related_error_codes": {"type": "array", "items": {"type": "string"}},
                "resolution_steps": {"type": "array", "items": {"type": "string"}},
                "internal_notes": {"type": ["string", "null"]}
            },
            "required": ["title", "body", "tags", "resolution_steps"],
            "additionalProperties": false
        }),
    )
}

/// Render the payload into a single article body.
fn render_body(payload: &ArticleDraftPayload) -> String {
    let mut body = payload.body.trim_end().to_string();

    if !payload.resolution_steps.is_empty() {
        body.push_str("\n\nResolution steps:\n");
        for (i, step) in payload.resolution_steps.iter().enumerate() {
            body.push_str(&format!("{}. {}\n", i + 1, step));
        }
    }
    if !payload.related_error_codes.is_empty() {
        body.push_str(&format!(
            "\nRelated error codes: {}\n",
            payload.related_error_codes.join(", ")
        ));
    }
    if let Some(notes) = &payload.internal_notes {
        if !notes.is_empty() {
            body.push_str(&format!("\nInternal notes: {notes}\n"));
        }
    }
    body
}

fn failed_queries(logs: &[RetrievalLogEntry]) -> String {
    let mut seen = Vec::new();
    for log in logs {
        if !seen.contains(&log.query_text) {
            seen.push(log.query_text.clone());
        }
    }
    if seen.is_empty() {
        return "  (no retrieval attempts were logged)".to_string();
    }
    seen.iter()
        .take(5)
        .map(|q| format!("  - {q}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn case_context(case: &ResolvedCase, transcript: Option<&str>, budget: usize) -> String {
    format!(
        "CASE ID: {}\nSUBJECT: {}\nDESCRIPTION: {}\nROOT CAUSE: {}\nRESOLUTION: {}\n\
         CATEGORY: {}\nSCRIPT: {}\n\nAGENT TRANSCRIPT (summary):\n{}",
        case.case_id,
        case.subject,
        case.description,
        case.root_cause,
        case.resolution,
        case.category.as_deref().unwrap_or("N/A"),
        case.script_id.as_deref().unwrap_or("none"),
        transcript
            .map(|t| truncate_chars(t, budget))
            .unwrap_or_else(|| "No transcript available.".to_string()),
    )
}

/// Draft a brand-new article for a knowledge gap, persist it as a draft,
/// and record its provenance.
pub async fn draft_new_article(
    ctx: &EngineContext,
    case: &ResolvedCase,
    transcript: Option<&str>,
    logs: &[RetrievalLogEntry],
) -> Result<Article> {
    let prompt = format!(
        "A support case was resolved but NO existing knowledge article could help. The agent \
         solved the issue from scratch. Draft an article capturing this knowledge.\n\n{}\n\n\
         FAILED SEARCH QUERIES (all returned unhelpful results):\n{}\n\n\
         Create a comprehensive article that would have helped resolve this case. Include the \
         problem description, root cause analysis, and step-by-step resolution.",
        case_context(case, transcript, ctx.config.transcript_budget),
        failed_queries(logs),
    );

    generate_and_persist(ctx, case, crate::prompts::DRAFT_ARTICLE_SYSTEM, prompt).await
}

/// Draft a replacement for a contradicted article, persist it as a draft,
/// and record its provenance.
pub async fn draft_replacement_article(
    ctx: &EngineContext,
    case: &ResolvedCase,
    transcript: Option<&str>,
    logs: &[RetrievalLogEntry],
    flagged: &Article,
) -> Result<Article> {
    let prompt = format!(
        "An existing knowledge article appears to be OUTDATED or INCORRECT based on a recently \
         resolved support case. Draft an updated replacement article.\n\n\
         EXISTING ARTICLE TITLE: {}\nEXISTING ARTICLE BODY:\n{}\n\n---\n\n\
         CASE THAT CONTRADICTS THE ABOVE:\n{}\n\nSEARCH QUERIES USED:\n{}\n\n\
         Create an updated article that incorporates the correct resolution from this case. \
         Keep any still-valid information from the existing article, but correct what is \
         outdated.",
        flagged.title,
        truncate_chars(&flagged.body, 2000),
        case_context(case, transcript, ctx.config.transcript_budget),
        failed_queries(logs),
    );

    generate_and_persist(ctx, case, crate::prompts::DRAFT_REPLACEMENT_SYSTEM, prompt).await
}

async fn generate_and_persist(
    ctx: &EngineContext,
    case: &ResolvedCase,
    system_prompt: &str,
    prompt: String,
) -> Result<Article> {
    let messages = [ChatMessage::system(system_prompt), ChatMessage::user(prompt)];
    let (payload, _usage) = generate_as::<ArticleDraftPayload>(
        ctx.generator.as_ref(),
        &messages,
        &article_draft_schema(),
        DRAFT_TEMPERATURE,
        ctx.config.max_schema_retries,
    )
    .await?;

    let mut article = Article::draft(payload.title.clone(), render_body(&payload));
    article.tags = payload.tags.clone();
    article.module = payload.module.clone();
    article.category = payload.category.clone().or_else(|| case.category.clone());

    ctx.articles.insert_article(article.clone()).await?;
    ctx.articles
        .add_provenance(provenance_for(&article.article_id, case))
        .await?;

    info!(
        article_id = %article.article_id,
        case_id = %case.case_id,
        "drafted knowledge article"
    );
    Ok(article)
}

/// The three provenance links every synthesized article carries. The
/// script link is always present; the empty source id is the sentinel for
/// "no script involved".
fn provenance_for(article_id: &str, case: &ResolvedCase) -> Vec<ProvenanceRecord> {
    let script_id = case.script_id.clone().unwrap_or_default();
    let script_snippet = if script_id.is_empty() {
        "No script associated with the case".to_string()
    } else {
        format!("Linked script {script_id} from the resolved case")
    };

    vec![
        ProvenanceRecord::new(
            article_id,
            ProvenanceSource::Case,
            case.case_id.clone(),
            Relationship::CreatedFrom,
            format!("Article drafted from case {}", case.case_id),
        ),
        ProvenanceRecord::new(
            article_id,
            ProvenanceSource::Conversation,
            case.conversation_id.clone(),
            Relationship::CreatedFrom,
            "Conversation transcript used as source context",
        ),
        ProvenanceRecord::new(
            article_id,
            ProvenanceSource::Script,
            script_id,
            Relationship::References,
            script_snippet,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn case() -> ResolvedCase {
        ResolvedCase {
            case_id: "CASE-1".into(),
            conversation_id: "CONV-1".into(),
            subject: "Date advance stuck".into(),
            description: "Property date will not advance".into(),
            resolution: "Ran the fix script".into(),
            root_cause: "Orphaned batch row".into(),
            category: Some("Advance Property Date".into()),
            tags: vec![],
            script_id: None,
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_provenance_spans_all_three_sources() {
        let records = provenance_for("ART-SYN-1", &case());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].source, ProvenanceSource::Case);
        assert_eq!(records[0].relationship, Relationship::CreatedFrom);
        assert_eq!(records[1].source, ProvenanceSource::Conversation);
        assert_eq!(records[2].source, ProvenanceSource::Script);
        assert_eq!(records[2].relationship, Relationship::References);
        // No script on the case: empty sentinel
        assert_eq!(records[2].source_id, "");
    }

    #[test]
    fn test_provenance_carries_script_when_present() {
        let mut with_script = case();
        with_script.script_id = Some("SCR-0293".into());
        let records = provenance_for("ART-SYN-1", &with_script);
        assert_eq!(records[2].source_id, "SCR-0293");
        assert_eq!(records[2].relationship, Relationship::References);
    }

    #[test]
    fn test_render_body_appends_steps_and_codes() {
        let payload = ArticleDraftPayload {
            title: "t".into(),
            body: "Problem and fix.".into(),
            tags: vec![],
            module: None,
            category: None,
            related_error_codes: vec!["E-1042".into()],
            resolution_steps: vec!["Open the batch".into(), "Run the script".into()],
            internal_notes: None,
        };
        let body = render_body(&payload);
        assert!(body.contains("1. Open the batch"));
        assert!(body.contains("2. Run the script"));
        assert!(body.contains("Related error codes: E-1042"));
    }

    #[test]
    fn test_failed_queries_deduplicates() {
        let log = |q: &str| RetrievalLogEntry {
            log_id: "RET-1".into(),
            case_id: None,
            conversation_id: None,
            attempt_no: 1,
            query_text: q.into(),
            source_kind: None,
            source_id: None,
            similarity_score: None,
            outcome: None,
            execution_id: None,
            created_at: Utc::now(),
        };
        let queries = failed_queries(&[log("a"), log("a"), log("b")]);
        assert_eq!(queries, "  - a\n  - b");
    }
}
