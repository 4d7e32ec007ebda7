//! Structured-output payloads for the pipeline's generation calls, with
//! their JSON Schemas.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sift_corpus::SourceKind;
use sift_models::OutputSchema;

/// One search query variant produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryVariant {
    pub query: String,
    pub rationale: String,
}

/// Planner output: 2-4 query variants.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalPlan {
    pub queries: Vec<QueryVariant>,
}

pub fn retrieval_plan_schema() -> OutputSchema {
    OutputSchema::new(
        "retrieval_plan",
        json!({
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "minItems": 2,
                    "maxItems": 4,
                    "items": {
                        "type": "object",
                        "properties": {
                            "query": {"type": "string"},
                            "rationale": {"type": "string"}
                        },
                        "required": ["query", "rationale"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["queries"],
            "additionalProperties": false
        }),
    )
}

/// A citation in a generated answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub source_kind: SourceKind,
    pub source_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

/// Answer-writing output.
#[derive(Debug, Clone, Deserialize)]
pub struct SupportAnswer {
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub self_confidence: Option<String>,
}

pub fn support_answer_schema() -> OutputSchema {
    OutputSchema::new(
        "support_answer",
        json!({
            "type": "object",
            "properties": {
                "answer": {"type": "string"},
                "citations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "source_kind": {
                                "type": "string",
                                "enum": ["SCRIPT", "ARTICLE", "CASE_RESOLUTION"]
                            },
                            "source_id": {"type": "string"},
                            "title": {"type": "string"},
                            "quote": {"type": ["string", "null"]}
                        },
                        "required": ["source_kind", "source_id", "title"],
                        "additionalProperties": false
                    }
                },
                "self_confidence": {
                    "type": "string",
                    "enum": ["low", "medium", "high"]
                }
            },
            "required": ["answer", "citations", "self_confidence"],
            "additionalProperties": false
        }),
    )
}

/// Gap-classifier output. The pipeline overwrites the best-match fields
/// with the actual top hit so they always reflect the evidence.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierDecision {
    pub verdict: sift_corpus::Verdict,
    pub reasoning: String,
    #[serde(default)]
    pub best_match_source_id: Option<String>,
    #[serde(default)]
    pub similarity_score: Option<f64>,
}

pub fn knowledge_decision_schema() -> OutputSchema {
    OutputSchema::new(
        "knowledge_decision",
        json!({
            "type": "object",
            "properties": {
                "verdict": {
                    "type": "string",
                    "enum": ["SAME_KNOWLEDGE", "CONTRADICTS", "NEW_KNOWLEDGE"]
                },
                "reasoning": {"type": "string"},
                "best_match_source_id": {"type": ["string", "null"]},
                "similarity_score": {"type": ["number", "null"]}
            },
            "required": ["verdict", "reasoning"],
            "additionalProperties": false
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retrieval_plan_parses() {
        let plan: RetrievalPlan = serde_json::from_value(json!({
            "queries": [
                {"query": "advance property date", "rationale": "exact terminology"},
                {"query": "date advance stuck", "rationale": "symptom phrasing"}
            ]
        }))
        .unwrap();
        assert_eq!(plan.queries.len(), 2);
    }

    #[test]
    fn test_support_answer_defaults_missing_citations() {
        let answer: SupportAnswer =
            serde_json::from_value(json!({"answer": "cannot answer"})).unwrap();
        assert!(answer.citations.is_empty());
        assert!(answer.self_confidence.is_none());
    }

    #[test]
    fn test_classifier_decision_parses_wire_verdicts() {
        let decision: ClassifierDecision = serde_json::from_value(json!({
            "verdict": "CONTRADICTS",
            "reasoning": "different action for the same symptom"
        }))
        .unwrap();
        assert_eq!(decision.verdict, sift_corpus::Verdict::Contradicts);
    }
}
