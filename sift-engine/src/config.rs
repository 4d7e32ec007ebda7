//! Engine configuration.
//!
//! A flat record of every knob, with working defaults. The environment is
//! injected at construction; nothing here reads globals.

use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Weights for the blended user-facing score. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub similarity: f64,
    pub rerank: f64,
    pub confidence: f64,
    pub freshness: f64,
    pub learning: f64,
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.similarity + self.rerank + self.confidence + self.freshness + self.learning
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            similarity: 0.35,
            rerank: 0.25,
            confidence: 0.20,
            freshness: 0.10,
            learning: 0.10,
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Embedding dimension, fixed for the life of a corpus. Checked against
    /// the store and the embedding port at engine construction.
    pub embedding_dim: usize,
    /// Evidence items returned when the caller does not specify.
    pub default_top_k: usize,
    /// Cap on merged candidates after variant retrieval.
    pub max_candidates: usize,
    /// Per-variant search depth floor; each variant searches
    /// `max(top_k, per_query_floor)` rows before merging.
    pub per_query_floor: usize,
    /// Below this best-hit similarity, gap detection always yields new
    /// knowledge regardless of the classifier's text.
    pub gap_similarity_threshold: f64,
    pub confidence_delta_resolved: f64,
    pub confidence_delta_partial: f64,
    pub confidence_delta_unhelpful: f64,
    pub confidence_delta_confirmed: f64,
    /// Freshness window for the blended score: entries older than this
    /// score 0 on the freshness signal.
    pub freshness_max_age_days: i64,
    /// Saturation pivot for the usage signal:
    /// `usage_count / (usage_count + usage_pivot)`.
    pub usage_pivot: f64,
    pub score_weights: ScoreWeights,
    pub reranker_enabled: bool,
    /// Extra attempts when a structured generation fails schema validation.
    pub max_schema_retries: u32,
    /// Character budget for conversation transcripts in prompts.
    pub transcript_budget: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 3072,
            default_top_k: 10,
            max_candidates: 40,
            per_query_floor: 15,
            gap_similarity_threshold: 0.75,
            confidence_delta_resolved: 0.10,
            confidence_delta_partial: 0.02,
            confidence_delta_unhelpful: -0.05,
            confidence_delta_confirmed: 0.05,
            freshness_max_age_days: 365,
            usage_pivot: 5.0,
            score_weights: ScoreWeights::default(),
            reranker_enabled: true,
            max_schema_retries: 2,
            transcript_budget: 3000,
        }
    }
}

impl EngineConfig {
    /// Validate internal consistency. Called by the engine constructor.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(EngineError::InvalidConfig("embedding_dim must be > 0".into()));
        }
        if self.default_top_k == 0 {
            return Err(EngineError::InvalidConfig("default_top_k must be > 0".into()));
        }
        if self.max_candidates == 0 {
            return Err(EngineError::InvalidConfig("max_candidates must be > 0".into()));
        }
        let sum = self.score_weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::InvalidConfig(format!(
                "score weights must sum to 1, got {sum}"
            )));
        }
        if !(0.0..=1.0).contains(&self.gap_similarity_threshold) {
            return Err(EngineError::InvalidConfig(
                "gap_similarity_threshold must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((ScoreWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unbalanced_weights_are_rejected() {
        let config = EngineConfig {
            score_weights: ScoreWeights {
                similarity: 0.9,
                rerank: 0.9,
                confidence: 0.0,
                freshness: 0.0,
                learning: 0.0,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        let config = EngineConfig {
            embedding_dim: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
