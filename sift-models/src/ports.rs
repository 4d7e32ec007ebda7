//! Provider ports: the three narrow interfaces the pipeline depends on.
//!
//! Concrete implementations live in [`providers`](crate::providers) (HTTP)
//! and [`mock`](crate::mock) (deterministic, for tests). Pipeline code only
//! ever sees these traits.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{ChatMessage, Error, OutputSchema, RankedDocument, Result, StructuredOutput, TokenUsage};

/// Text embedding provider.
///
/// Batching is part of the contract: the retrieval pipeline embeds all of a
/// plan's query variants in one call.
#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimension of the vectors this provider produces.
    fn dimension(&self) -> usize;
}

/// Structured chat-completion provider.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// Generate a JSON value conforming to `schema`.
    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
        temperature: f32,
    ) -> Result<StructuredOutput>;
}

/// Relevance reranking provider. Optional; callers fall back to similarity
/// order when no reranker is configured or the call fails.
#[async_trait]
pub trait RerankPort: Send + Sync {
    /// Rank `documents` by relevance to `query`, best first, at most
    /// `top_k` results.
    async fn rerank(&self, query: &str, documents: &[String], top_k: usize)
        -> Result<Vec<RankedDocument>>;
}

/// Typed structured generation with schema-violation retries.
///
/// Calls the port and deserializes the value into `T`; a value that fails
/// to deserialize counts as a schema violation and the call is retried, up
/// to `max_retries` extra attempts. Transport errors are not retried here.
pub async fn generate_as<T: DeserializeOwned>(
    port: &dyn GenerationPort,
    messages: &[ChatMessage],
    schema: &OutputSchema,
    temperature: f32,
    max_retries: u32,
) -> Result<(T, TokenUsage)> {
    let mut usage = TokenUsage::default();
    let mut reason = String::new();

    for _ in 0..=max_retries {
        let output = port.generate_structured(messages, schema, temperature).await?;
        usage += output.usage;
        match serde_json::from_value::<T>(output.value) {
            Ok(parsed) => return Ok((parsed, usage)),
            Err(e) => reason = e.to_string(),
        }
    }

    Err(Error::SchemaValidation {
        attempts: max_retries + 1,
        reason,
    })
}
