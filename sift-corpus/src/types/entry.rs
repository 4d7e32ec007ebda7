//! Corpus entries: the atoms of retrievable knowledge.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which ancestral table a corpus entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    /// Backend data-fix script.
    Script,
    /// Knowledge article (seed or synthesized).
    Article,
    /// A past case's resolution.
    CaseResolution,
}

impl SourceKind {
    /// All kinds, in search-scope order.
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Script,
        SourceKind::Article,
        SourceKind::CaseResolution,
    ];

    /// Wire spelling, as stored and logged.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "SCRIPT",
            Self::Article => "ARTICLE",
            Self::CaseResolution => "CASE_RESOLUTION",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCRIPT" => Ok(Self::Script),
            "ARTICLE" => Ok(Self::Article),
            "CASE_RESOLUTION" => Ok(Self::CaseResolution),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

/// Composite key identifying a corpus entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub kind: SourceKind,
    pub id: String,
}

impl EntryKey {
    pub fn new(kind: SourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A unit of knowledge with its embedding and learning state.
///
/// Exactly one embedding per entry, of the dimension the store was opened
/// with. Confidence and usage are mutated only through
/// [`CorpusStore::adjust_confidence`](crate::store::CorpusStore::adjust_confidence)
/// and [`CorpusStore::bump_usage`](crate::store::CorpusStore::bump_usage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub kind: SourceKind,
    pub source_id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    pub embedding: Vec<f32>,
    pub confidence: f64,
    pub usage_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl CorpusEntry {
    /// Create an entry with default learning state (confidence 0.5, unused).
    pub fn new(
        kind: SourceKind,
        source_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            kind,
            source_id: source_id.into(),
            title: title.into(),
            content: content.into(),
            category: None,
            module: None,
            tags: None,
            embedding,
            confidence: 0.5,
            usage_count: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.kind, self.source_id.clone())
    }
}

/// A retrieved entry with its similarity and the ranking fields the
/// pipeline fills in downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusHit {
    pub kind: SourceKind,
    pub source_id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Cosine similarity against the query vector, in [0, 1].
    pub similarity: f64,
    /// Raw reranker relevance, when a reranker ran. Observability only;
    /// never the public confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
    /// Blended user-facing score. Set by the pipeline's ranking stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    pub confidence: f64,
    pub usage_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl CorpusHit {
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.kind, self.source_id.clone())
    }

    /// Build a hit from an entry and a computed similarity.
    pub fn from_entry(entry: &CorpusEntry, similarity: f64) -> Self {
        Self {
            kind: entry.kind,
            source_id: entry.source_id.clone(),
            title: entry.title.clone(),
            content: entry.content.clone(),
            category: entry.category.clone(),
            module: entry.module.clone(),
            tags: entry.tags.clone(),
            similarity,
            rerank_score: None,
            final_score: None,
            confidence: entry.confidence,
            usage_count: entry.usage_count,
            updated_at: entry.updated_at,
        }
    }
}

/// Result of a single confidence adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceUpdate {
    pub kind: SourceKind,
    pub source_id: String,
    pub delta: f64,
    pub new_confidence: f64,
    pub new_usage_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_roundtrip() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_source_kind_serde_uses_wire_spelling() {
        let json = serde_json::to_string(&SourceKind::CaseResolution).unwrap();
        assert_eq!(json, "\"CASE_RESOLUTION\"");
    }

    #[test]
    fn test_entry_key_display() {
        let key = EntryKey::new(SourceKind::Article, "ART-0001");
        assert_eq!(key.to_string(), "ARTICLE:ART-0001");
    }

    #[test]
    fn test_entry_builder_clamps_confidence() {
        let entry = CorpusEntry::new(SourceKind::Script, "SCR-1", "t", "c", vec![0.0; 4])
            .with_confidence(1.7);
        assert_eq!(entry.confidence, 1.0);
    }

    #[test]
    fn test_hit_from_entry_carries_learning_state() {
        let entry = CorpusEntry::new(SourceKind::Script, "SCR-1", "t", "c", vec![0.0; 4])
            .with_confidence(0.8);
        let hit = CorpusHit::from_entry(&entry, 0.91);
        assert_eq!(hit.similarity, 0.91);
        assert_eq!(hit.confidence, 0.8);
        assert!(hit.rerank_score.is_none());
        assert!(hit.final_score.is_none());
    }
}
