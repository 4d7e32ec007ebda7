//! The review gateway: the single chokepoint that mutates an article's
//! lifecycle after initial drafting.
//!
//! Events are a strict two-state machine, pending -> finalized. The event
//! is finalized first (an atomic gate in the store), then the article and
//! corpus effects are applied, so a concurrent double-review can never
//! apply effects twice.

use chrono::Utc;
use sift_corpus::{
    Article, ArticleStatus, CorpusEntry, EventKind, LearningEvent, ReviewStatus, ReviewerRole,
    SourceKind,
};
use tracing::info;

use crate::{EngineContext, EngineError, Result};

/// Confidence a freshly approved article enters the corpus with.
const APPROVED_ARTICLE_CONFIDENCE: f64 = 0.75;

/// Apply a reviewer's decision to a pending learning event.
pub async fn apply_review(
    ctx: &EngineContext,
    event_id: &str,
    decision: ReviewStatus,
    reviewer_role: ReviewerRole,
    reason: Option<String>,
) -> Result<LearningEvent> {
    let event = ctx
        .events
        .finalize_event(event_id, decision, reviewer_role, reason)
        .await
        .map_err(EngineError::from_store)?;

    match (decision, event.event_kind) {
        (ReviewStatus::Approved, EventKind::Gap) => {
            if let Some(article_id) = &event.proposed_article_id {
                activate_draft(ctx, article_id).await?;
            }
        }
        (ReviewStatus::Approved, EventKind::Contradiction) => {
            if let (Some(flagged_id), Some(draft_id)) =
                (&event.flagged_article_id, &event.proposed_article_id)
            {
                apply_replacement(ctx, flagged_id, draft_id).await?;
            }
        }
        (ReviewStatus::Rejected, _) => {
            // The corpus is untouched; the draft is shelved
            if let Some(article_id) = &event.proposed_article_id {
                ctx.articles
                    .set_status(article_id, ArticleStatus::Archived)
                    .await
                    .map_err(EngineError::from_store)?;
            }
        }
        (ReviewStatus::Approved, EventKind::Confirmed) => {}
    }

    info!(event_id, ?decision, kind = ?event.event_kind, "learning event reviewed");
    Ok(event)
}

/// GAP approval: activate the draft and add it to the corpus.
async fn activate_draft(ctx: &EngineContext, article_id: &str) -> Result<()> {
    let mut article = load_article(ctx, article_id).await?;
    article.status = ArticleStatus::Active;
    article.updated_at = Utc::now();
    ctx.articles
        .update_article(article.clone())
        .await
        .map_err(EngineError::from_store)?;

    let entry = corpus_entry_for(ctx, &article, APPROVED_ARTICLE_CONFIDENCE, 0).await?;
    ctx.corpus.upsert(entry).await.map_err(EngineError::from_store)?;
    Ok(())
}

/// CONTRADICTION approval: rewrite the flagged article in place with the
/// draft's content, refresh its corpus entry, and archive the draft.
async fn apply_replacement(ctx: &EngineContext, flagged_id: &str, draft_id: &str) -> Result<()> {
    let draft = load_article(ctx, draft_id).await?;
    let mut flagged = load_article(ctx, flagged_id).await?;

    flagged.title = draft.title.clone();
    flagged.body = draft.body.clone();
    flagged.tags = draft.tags.clone();
    flagged.module = draft.module.clone();
    flagged.category = draft.category.clone();
    flagged.status = ArticleStatus::Active;
    flagged.updated_at = Utc::now();
    ctx.articles
        .update_article(flagged.clone())
        .await
        .map_err(EngineError::from_store)?;

    // The entry keeps its id and learning state; only content and
    // embedding change
    let (confidence, usage_count) = match ctx
        .corpus
        .get(SourceKind::Article, flagged_id)
        .await
        .map_err(EngineError::from_store)?
    {
        Some(existing) => (existing.confidence, existing.usage_count),
        None => (APPROVED_ARTICLE_CONFIDENCE, 0),
    };
    let entry = corpus_entry_for(ctx, &flagged, confidence, usage_count).await?;
    ctx.corpus.upsert(entry).await.map_err(EngineError::from_store)?;

    ctx.articles
        .set_status(draft_id, ArticleStatus::Archived)
        .await
        .map_err(EngineError::from_store)?;
    Ok(())
}

async fn load_article(ctx: &EngineContext, article_id: &str) -> Result<Article> {
    ctx.articles
        .get_article(article_id)
        .await
        .map_err(EngineError::from_store)?
        .ok_or_else(|| EngineError::ArticleNotFound(article_id.to_string()))
}

/// Embed an article's body and build its corpus entry.
async fn corpus_entry_for(
    ctx: &EngineContext,
    article: &Article,
    confidence: f64,
    usage_count: u32,
) -> Result<CorpusEntry> {
    let vectors = ctx.embedder.embed_batch(&[article.body.clone()]).await?;
    let embedding = vectors.into_iter().next().ok_or_else(|| {
        EngineError::Provider(sift_models::Error::ProviderApi(
            "embedding batch returned no vectors".into(),
        ))
    })?;

    let mut entry = CorpusEntry::new(
        SourceKind::Article,
        article.article_id.clone(),
        article.title.clone(),
        article.body.clone(),
        embedding,
    )
    .with_confidence(confidence);
    entry.usage_count = usage_count;
    entry.category = article.category.clone();
    entry.module = article.module.clone();
    if !article.tags.is_empty() {
        entry.tags = Some(article.tags.join(", "));
    }
    Ok(entry)
}
