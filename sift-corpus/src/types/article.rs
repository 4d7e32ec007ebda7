//! Knowledge articles and their provenance links.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ids;

/// Lifecycle status of an article.
///
/// Only `Active` articles appear in the retrieval corpus; drafts and
/// archived articles do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    Active,
    Draft,
    Archived,
}

/// How an article came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleOrigin {
    /// Authored outside the learning loop.
    Seed,
    /// Drafted by the learning loop from a resolved case.
    Synthesized,
}

/// The human-readable knowledge artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub article_id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub status: ArticleStatus,
    pub origin: ArticleOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Create a synthesized draft with a fresh `ART-SYN-` id.
    pub fn draft(title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            article_id: ids::synthesized_article_id(),
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
            module: None,
            category: None,
            status: ArticleStatus::Draft,
            origin: ArticleOrigin::Synthesized,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The ancestral record a provenance link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvenanceSource {
    Case,
    Conversation,
    Script,
}

impl fmt::Display for ProvenanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Case => "Case",
            Self::Conversation => "Conversation",
            Self::Script => "Script",
        };
        f.write_str(s)
    }
}

/// How an article relates to an ancestral record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    CreatedFrom,
    References,
}

/// One provenance link from an article back to a source record.
///
/// Every synthesized article carries exactly three:
/// `CREATED_FROM Case`, `CREATED_FROM Conversation`, `REFERENCES Script`
/// (empty-string source id when no script was involved).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub article_id: String,
    pub source: ProvenanceSource,
    pub source_id: String,
    pub relationship: Relationship,
    pub evidence_snippet: String,
    pub timestamp: DateTime<Utc>,
}

impl ProvenanceRecord {
    pub fn new(
        article_id: impl Into<String>,
        source: ProvenanceSource,
        source_id: impl Into<String>,
        relationship: Relationship,
        evidence_snippet: impl Into<String>,
    ) -> Self {
        Self {
            article_id: article_id.into(),
            source,
            source_id: source_id.into(),
            relationship,
            evidence_snippet: evidence_snippet.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_articles_start_as_synthesized_drafts() {
        let article = Article::draft("Fix voucher export", "Steps...");
        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(article.origin, ArticleOrigin::Synthesized);
        assert!(article.article_id.starts_with("ART-SYN-"));
    }

    #[test]
    fn test_relationship_wire_spelling() {
        let json = serde_json::to_string(&Relationship::CreatedFrom).unwrap();
        assert_eq!(json, "\"CREATED_FROM\"");
    }
}
