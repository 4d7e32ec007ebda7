//! Resolved cases and the read-only ancillary records around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A support case that has been closed with a structured outcome.
///
/// Immutable once stored; the learning loop only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCase {
    pub case_id: String,
    pub conversation_id: String,
    pub subject: String,
    pub description: String,
    pub resolution: String,
    pub root_cause: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    pub closed_at: DateTime<Utc>,
}

/// The opaque conversation view consumed by drafting. The pipeline never
/// writes conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub transcript: String,
}

/// Ancillary metadata for a backend script, attached during enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptMeta {
    pub script_id: String,
    pub purpose: String,
    pub required_inputs: Vec<String>,
}
