//! Cohere-compatible rerank provider.
//!
//! Targets the `/v1/rerank` endpoint. Reranking is optional everywhere it
//! is used; callers treat any failure as "no reranker" and keep similarity
//! order.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, RankedDocument, RerankPort};

/// Default Cohere API base URL.
const DEFAULT_BASE_URL: &str = "https://api.cohere.com/v1";

/// Default rerank model.
const DEFAULT_MODEL: &str = "rerank-english-v3.0";

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Debug, Deserialize)]
pub struct RerankResponse {
    pub results: Vec<RerankRow>,
}

#[derive(Debug, Deserialize)]
pub struct RerankRow {
    pub index: usize,
    pub relevance_score: f64,
}

/// Cohere-compatible rerank provider.
pub struct CohereProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl CohereProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RerankPort for CohereProvider {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedDocument>, Error> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: top_k.min(documents.len()),
        };

        let url = format!("{}/rerank", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "Cohere API returned {status}: {body}"
            )));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|row| RankedDocument {
                index: row.index,
                relevance_score: row.relevance_score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_endpoint() {
        let provider = CohereProvider::new("co-test");
        assert_eq!(provider.base_url(), "https://api.cohere.com/v1");
    }

    #[test]
    fn parse_rerank_response() {
        let json = r#"{
            "id": "rerank-1",
            "results": [
                {"index": 2, "relevance_score": 0.9934},
                {"index": 0, "relevance_score": 0.4201}
            ],
            "meta": {"api_version": {"version": "1"}}
        }"#;
        let response: RerankResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].index, 2);
        assert!(response.results[0].relevance_score > response.results[1].relevance_score);
    }

    #[tokio::test]
    async fn rerank_with_no_documents_short_circuits() {
        let provider = CohereProvider::new("co-test");
        let ranked = provider.rerank("query", &[], 5).await.unwrap();
        assert!(ranked.is_empty());
    }
}
