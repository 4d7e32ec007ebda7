//! Knowledge-gap classification decisions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::SourceKind;

/// How a resolved case's knowledge relates to the existing corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Already covered by an existing entry.
    #[serde(rename = "SAME_KNOWLEDGE")]
    Same,
    /// Covered, but the existing entry prescribes a materially different
    /// action for the same symptom.
    #[serde(rename = "CONTRADICTS")]
    Contradicts,
    /// Not adequately covered.
    #[serde(rename = "NEW_KNOWLEDGE")]
    New,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Same => "SAME_KNOWLEDGE",
            Self::Contradicts => "CONTRADICTS",
            Self::New => "NEW_KNOWLEDGE",
        };
        f.write_str(s)
    }
}

/// The classifier's decision for one resolved case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDecision {
    pub verdict: Verdict,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match_source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match_source_kind: Option<SourceKind>,
    pub similarity_score: f64,
}

impl KnowledgeDecision {
    /// The decision when retrieval produced no evidence at all.
    pub fn no_evidence() -> Self {
        Self {
            verdict: Verdict::New,
            reasoning: "No matching entries found in the corpus.".into(),
            best_match_source_id: None,
            best_match_source_kind: None,
            similarity_score: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&Verdict::Same).unwrap(),
            "\"SAME_KNOWLEDGE\""
        );
        assert_eq!(Verdict::Contradicts.to_string(), "CONTRADICTS");
    }

    #[test]
    fn test_no_evidence_decision_is_new() {
        let decision = KnowledgeDecision::no_evidence();
        assert_eq!(decision.verdict, Verdict::New);
        assert_eq!(decision.similarity_score, 0.0);
    }
}
