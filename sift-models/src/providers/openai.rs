//! OpenAI-compatible provider for embeddings and structured generation.
//!
//! Targets the `/v1/embeddings` and `/v1/chat/completions` endpoints, so it
//! also works against self-hosted gateways that speak the same dialect.
//!
//! # Example
//!
//! ```ignore
//! use sift_models::providers::OpenAiProvider;
//!
//! let provider = OpenAiProvider::new("sk-...", 3072);
//! let provider = OpenAiProvider::new("sk-...", 3072)
//!     .with_base_url("http://localhost:8080/v1");
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    ChatMessage, EmbeddingPort, Error, GenerationPort, OutputSchema, StructuredOutput, TokenUsage,
};

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default models, overridable per provider instance.
const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-large";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o";

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingsResponse {
    pub data: Vec<EmbeddingRow>,
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingRow {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaSpec<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl From<&ApiUsage> for TokenUsage {
    fn from(usage: &ApiUsage) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAiProvider
// ────────────────────────────────────────────────────────────────────────────

/// OpenAI-compatible embedding + structured generation provider.
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    embed_model: String,
    chat_model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider with default endpoint and models, pinned to an
    /// embedding dimension.
    pub fn new(api_key: impl Into<String>, dimension: usize) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            dimension,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Error> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "OpenAI API returned {status}: {body}"
            )));
        }

        response.json().await.map_err(|e| Error::Request(e.to_string()))
    }
}

#[async_trait]
impl EmbeddingPort for OpenAiProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let request = EmbeddingsRequest {
            model: &self.embed_model,
            input: texts,
            dimensions: self.dimension,
        };
        let response: EmbeddingsResponse = self.post_json("/embeddings", &request).await?;

        // Restore input order from response indices
        let mut vectors: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];
        for row in response.data {
            if row.embedding.len() != self.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.dimension,
                    actual: row.embedding.len(),
                });
            }
            if let Some(slot) = vectors.get_mut(row.index) {
                *slot = row.embedding;
            }
        }
        if vectors.iter().any(Vec::is_empty) {
            return Err(Error::ProviderApi(
                "embeddings response is missing rows".into(),
            ));
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl GenerationPort for OpenAiProvider {
    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
        temperature: f32,
    ) -> Result<StructuredOutput, Error> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            temperature,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaSpec {
                    name: schema.name,
                    schema: &schema.schema,
                    strict: true,
                },
            },
        };
        let response: ChatResponse = self.post_json("/chat/completions", &request).await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| Error::ProviderApi("chat response has no choices".into()))?;
        let value: serde_json::Value = serde_json::from_str(&choice.message.content)?;

        Ok(StructuredOutput {
            value,
            usage: response.usage.as_ref().map(TokenUsage::from).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_endpoint() {
        let provider = OpenAiProvider::new("sk-test", 3072);
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
        assert_eq!(provider.dimension(), 3072);
    }

    #[test]
    fn with_base_url_overrides_endpoint() {
        let provider =
            OpenAiProvider::new("sk-test", 8).with_base_url("http://localhost:8080/v1");
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn parse_embeddings_response() {
        let json = r#"{
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.3, 0.4]},
                {"object": "embedding", "index": 0, "embedding": [0.1, 0.2]}
            ],
            "model": "text-embedding-3-large",
            "usage": {"prompt_tokens": 7, "total_tokens": 7}
        }"#;
        let response: EmbeddingsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].index, 1);
        assert_eq!(response.usage.unwrap().prompt_tokens, 7);
    }

    #[test]
    fn parse_chat_response_extracts_content() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "{\"answer\": \"ok\"}"},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 20, "completion_tokens": 9, "total_tokens": 29}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content, "{\"answer\": \"ok\"}");
        let usage: TokenUsage = response.usage.as_ref().unwrap().into();
        assert_eq!(usage, TokenUsage::new(20, 9));
    }

    #[test]
    fn chat_request_serializes_json_schema_format() {
        let schema_value = serde_json::json!({"type": "object"});
        let schema = OutputSchema::new("plan", schema_value);
        let messages = vec![ChatMessage::user("hello")];
        let request = ChatRequest {
            model: "gpt-4o",
            messages: &messages,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaSpec {
                    name: schema.name,
                    schema: &schema.schema,
                    strict: true,
                },
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(value["response_format"]["json_schema"]["name"], "plan");
        assert_eq!(value["response_format"]["json_schema"]["strict"], true);
    }
}
