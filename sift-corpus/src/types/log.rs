//! Retrieval attempt logs and pipeline execution records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SourceKind;

/// Outcome of a retrieval attempt, stamped at case closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalOutcome {
    Resolved,
    Unhelpful,
    Partial,
}

impl fmt::Display for RetrievalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resolved => "RESOLVED",
            Self::Unhelpful => "UNHELPFUL",
            Self::Partial => "PARTIAL",
        };
        f.write_str(s)
    }
}

/// One evidence hit from one retrieval attempt.
///
/// Written during live retrieval with only the conversation id set; the
/// case id and outcome are stamped later at closure. Both stampings are
/// monotonic (null -> value), never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalLogEntry {
    pub log_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub attempt_no: u32,
    pub query_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_kind: Option<SourceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RetrievalOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Which pipeline variant an execution ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraphKind {
    Qa,
    Gap,
}

/// Terminal status of a pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Ok,
    Error,
    InsufficientEvidence,
}

/// Pipeline-level observability row, one per attempt.
///
/// Attempts of the same logical run share an `EXEC-<hex>` prefix and differ
/// in the `-aN` suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub graph_kind: GraphKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub query: String,
    pub total_latency_ms: u64,
    /// Node name -> elapsed milliseconds, in execution order.
    pub node_latencies: Vec<(String, u64)>,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub evidence_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_rerank_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_spelling() {
        let json = serde_json::to_string(&RetrievalOutcome::Unhelpful).unwrap();
        assert_eq!(json, "\"UNHELPFUL\"");
        assert_eq!(RetrievalOutcome::Resolved.to_string(), "RESOLVED");
    }

    #[test]
    fn test_execution_status_wire_spelling() {
        let json = serde_json::to_string(&ExecutionStatus::InsufficientEvidence).unwrap();
        assert_eq!(json, "\"insufficient_evidence\"");
    }
}
