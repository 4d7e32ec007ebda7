//! Deterministic mock providers.
//!
//! Public (not test-gated) so downstream crates can drive the pipeline
//! without a network. Every mock is fully deterministic: the embedder
//! hashes tokens, the generator replays a queue, the reranker scores from
//! a fixed table.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    ChatMessage, EmbeddingPort, Error, GenerationPort, OutputSchema, RankedDocument, RerankPort,
    StructuredOutput, TokenUsage,
};

// ────────────────────────────────────────────────────────────────────────────
// StaticEmbedder
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic embedder.
///
/// Texts matching a registered route (substring match, first wins) embed to
/// the route's vector; everything else falls back to a normalized
/// token-hash embedding. Routes make similarity in tests exact while the
/// fallback keeps arbitrary text usable.
pub struct StaticEmbedder {
    dimension: usize,
    routes: Vec<(String, Vec<f32>)>,
}

impl StaticEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            routes: Vec::new(),
        }
    }

    /// Map any text containing `needle` to `vector`.
    pub fn route(mut self, needle: impl Into<String>, vector: Vec<f32>) -> Self {
        self.routes.push((needle.into(), vector));
        self
    }

    fn hash_embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for token in text.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            // FNV-1a over the lowercased token
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in token.to_lowercase().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
            v[(hash % self.dimension as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingPort for StaticEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        Ok(texts
            .iter()
            .map(|text| {
                self.routes
                    .iter()
                    .find(|(needle, _)| text.contains(needle.as_str()))
                    .map(|(_, vector)| vector.clone())
                    .unwrap_or_else(|| self.hash_embed(text))
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that always fails, for provider-outage scenarios.
pub struct FailingEmbedder {
    dimension: usize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingPort for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        Err(Error::ProviderApi("embedding provider unavailable".into()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ScriptedGenerator
// ────────────────────────────────────────────────────────────────────────────

/// One recorded generation call, for assertions.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub schema_name: &'static str,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

/// Generator that replays a queue of canned JSON values.
///
/// Each `generate_structured` call pops the front of the queue. An empty
/// queue is a provider failure, which doubles as failure injection.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<serde_json::Value>>,
    calls: Mutex<Vec<GenerationCall>>,
    usage_per_call: TokenUsage,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            usage_per_call: TokenUsage::new(25, 10),
        }
    }

    /// Enqueue the next structured value to return.
    pub fn push(&self, value: serde_json::Value) {
        self.responses.lock().unwrap().push_back(value);
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationPort for ScriptedGenerator {
    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
        temperature: f32,
    ) -> Result<StructuredOutput, Error> {
        self.calls.lock().unwrap().push(GenerationCall {
            schema_name: schema.name,
            temperature,
            messages: messages.to_vec(),
        });

        let value = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::ProviderApi("scripted generator exhausted".into()))?;

        Ok(StructuredOutput {
            value,
            usage: self.usage_per_call,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ScriptedReranker
// ────────────────────────────────────────────────────────────────────────────

/// Reranker that scores documents from a fixed needle table.
///
/// A document's score is the score of the first needle it contains, or the
/// fallback score. Results come back best-first with ties broken on the
/// original index, mirroring real providers' sorted output.
pub struct ScriptedReranker {
    scores: Vec<(String, f64)>,
    fallback: f64,
}

impl ScriptedReranker {
    pub fn new() -> Self {
        Self {
            scores: Vec::new(),
            fallback: 0.1,
        }
    }

    pub fn score(mut self, needle: impl Into<String>, score: f64) -> Self {
        self.scores.push((needle.into(), score));
        self
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }
}

impl Default for ScriptedReranker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RerankPort for ScriptedReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedDocument>, Error> {
        let mut ranked: Vec<RankedDocument> = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let relevance_score = self
                    .scores
                    .iter()
                    .find(|(needle, _)| doc.contains(needle.as_str()))
                    .map(|(_, score)| *score)
                    .unwrap_or(self.fallback);
                RankedDocument {
                    index,
                    relevance_score,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.index.cmp(&b.index))
        });
        ranked.truncate(top_k);
        Ok(ranked)
    }
}

/// Reranker that always fails, for fallback-path scenarios.
pub struct FailingReranker;

#[async_trait]
impl RerankPort for FailingReranker {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[String],
        _top_k: usize,
    ) -> Result<Vec<RankedDocument>, Error> {
        Err(Error::ProviderApi("rerank provider unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn static_embedder_routes_take_precedence() {
        let embedder = StaticEmbedder::new(4).route("date advance", vec![1.0, 0.0, 0.0, 0.0]);
        let vectors = embedder
            .embed_batch(&["how to run a date advance".to_string(), "other".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0, 0.0]);
        assert_ne!(vectors[1], vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn static_embedder_is_deterministic() {
        let embedder = StaticEmbedder::new(8);
        let a = embedder.embed_batch(&["advance property date".to_string()]).await.unwrap();
        let b = embedder.embed_batch(&["advance property date".to_string()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 8);
    }

    #[tokio::test]
    async fn scripted_generator_replays_and_records() {
        let generator = ScriptedGenerator::new();
        generator.push(json!({"ok": true}));

        let schema = OutputSchema::new("test", json!({"type": "object"}));
        let out = generator
            .generate_structured(&[ChatMessage::user("hi")], &schema, 0.3)
            .await
            .unwrap();
        assert_eq!(out.value, json!({"ok": true}));

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].schema_name, "test");
        assert_eq!(calls[0].temperature, 0.3);

        let err = generator
            .generate_structured(&[ChatMessage::user("hi")], &schema, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProviderApi(_)));
    }

    #[tokio::test]
    async fn scripted_reranker_sorts_by_score() {
        let reranker = ScriptedReranker::new().score("scripts", 0.9).score("waitlist", 0.4);
        let docs = vec![
            "article about waitlist".to_string(),
            "fix scripts for dates".to_string(),
            "unrelated".to_string(),
        ];
        let ranked = reranker.rerank("q", &docs, 2).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].index, 1);
        assert_eq!(ranked[1].index, 0);
    }
}
