//! User-facing blended scoring.
//!
//! Raw similarity ranks retrieval; rerank scores rank relevance; but the
//! order shown to agents also folds in what the corpus has learned: entry
//! confidence, saturating usage, and freshness. The blend below is the only
//! ordering surfaced to callers.

use chrono::{DateTime, Utc};
use sift_corpus::CorpusHit;

use crate::EngineConfig;

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Freshness signal: linear decay to 0 over the configured window.
fn freshness(updated_at: DateTime<Utc>, now: DateTime<Utc>, max_age_days: i64) -> f64 {
    if max_age_days <= 0 {
        return 0.0;
    }
    let age_days = (now - updated_at).num_days().max(0);
    clamp01(1.0 - age_days as f64 / max_age_days as f64)
}

/// Saturating usage signal: `usage / (usage + pivot)`.
fn usage_factor(usage_count: u32, pivot: f64) -> f64 {
    if pivot <= 0.0 {
        return 1.0;
    }
    let usage = f64::from(usage_count);
    usage / (usage + pivot)
}

/// Blend the five signals for one hit.
pub fn final_score(hit: &CorpusHit, now: DateTime<Utc>, config: &EngineConfig) -> f64 {
    let w = &config.score_weights;
    let rerank_norm = hit.rerank_score.map(clamp01).unwrap_or(hit.similarity);

    w.similarity * hit.similarity
        + w.rerank * rerank_norm
        + w.confidence * hit.confidence
        + w.freshness * freshness(hit.updated_at, now, config.freshness_max_age_days)
        + w.learning * usage_factor(hit.usage_count, config.usage_pivot)
}

/// Score and order evidence: `final_score` descending, ties broken on
/// `source_id` ascending so equal-scoring hits never reorder between runs.
pub fn rank_evidence(evidence: &mut [CorpusHit], now: DateTime<Utc>, config: &EngineConfig) {
    for hit in evidence.iter_mut() {
        hit.final_score = Some(final_score(hit, now, config));
    }
    evidence.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sift_corpus::{CorpusEntry, SourceKind};

    fn hit(id: &str, similarity: f64) -> CorpusHit {
        let entry = CorpusEntry::new(SourceKind::Article, id, "t", "c", vec![0.0; 4]);
        CorpusHit::from_entry(&entry, similarity)
    }

    #[test]
    fn test_final_score_stays_in_unit_interval() {
        let config = EngineConfig::default();
        let now = Utc::now();

        let mut best = hit("ART-1", 1.0);
        best.rerank_score = Some(1.0);
        best.confidence = 1.0;
        best.usage_count = 1000;
        assert!(final_score(&best, now, &config) <= 1.0);

        let mut worst = hit("ART-2", 0.0);
        worst.confidence = 0.0;
        worst.updated_at = now - Duration::days(4000);
        assert!(final_score(&worst, now, &config) >= 0.0);
    }

    #[test]
    fn test_missing_rerank_score_substitutes_similarity() {
        let config = EngineConfig::default();
        let now = Utc::now();

        let without = hit("ART-1", 0.8);
        let mut with = hit("ART-2", 0.8);
        with.rerank_score = Some(0.8);

        let a = final_score(&without, now, &config);
        let b = final_score(&with, now, &config);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_breaks_similarity_parity() {
        let config = EngineConfig::default();
        let now = Utc::now();

        let low = hit("ART-1", 0.8);
        let mut high = hit("ART-2", 0.8);
        high.confidence = 0.9;
        assert!(final_score(&high, now, &config) > final_score(&low, now, &config));
    }

    #[test]
    fn test_usage_signal_saturates() {
        let config = EngineConfig::default();
        let light = usage_factor(1, config.usage_pivot);
        let heavy = usage_factor(50, config.usage_pivot);
        let heavier = usage_factor(500, config.usage_pivot);
        assert!(heavy > light);
        assert!(heavier - heavy < heavy - light);
        assert!(heavier < 1.0);
    }

    #[test]
    fn test_stale_entries_lose_freshness() {
        let now = Utc::now();
        assert_eq!(freshness(now, now, 365), 1.0);
        assert_eq!(freshness(now - Duration::days(400), now, 365), 0.0);
        let halfway = freshness(now - Duration::days(182), now, 365);
        assert!(halfway > 0.4 && halfway < 0.6);
    }

    #[test]
    fn test_rank_evidence_breaks_ties_on_source_id() {
        let config = EngineConfig::default();
        let now = Utc::now();
        let mut evidence = vec![hit("ART-9", 0.8), hit("ART-2", 0.8)];
        rank_evidence(&mut evidence, now, &config);
        assert_eq!(evidence[0].source_id, "ART-2");
        assert!(evidence[0].final_score.is_some());
    }
}
