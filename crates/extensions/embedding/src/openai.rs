//! Embeddings from an OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use graphmem_protocols::{Embedding, EmbeddingError, EmbeddingProvider};

#[cfg(test)]
#[path = "openai_tests.rs"]
mod tests;

const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_DIMENSION: usize = 1536;
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingConfig {
    pub api_key: String,
    pub model: String,
    /// API root; `/embeddings` is appended.
    pub base_url: String,
    /// Requested vector length, sent as `dimensions` and checked on the reply.
    pub dimension: usize,
    pub request_timeout: Duration,
}

impl OpenAIEmbeddingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            dimension: DEFAULT_DIMENSION,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

/// Provider backed by an OpenAI-compatible HTTP API.
pub struct OpenAIEmbedding {
    client: reqwest::Client,
    config: OpenAIEmbeddingConfig,
}

impl OpenAIEmbedding {
    pub fn new(config: OpenAIEmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self::new(OpenAIEmbeddingConfig::new(api_key))
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<VectorRecord>, EmbeddingError> {
        let body = EmbeddingsRequest {
            input: texts,
            model: &self.config.model,
            dimensions: self.config.dimension,
        };
        let url = self.config.endpoint();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Failed(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let mut detail = response.text().await.unwrap_or_default();
            if detail.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| detail.is_char_boundary(*i))
                    .unwrap_or(0);
                detail.truncate(cut);
            }
            return Err(EmbeddingError::Failed(format!(
                "{} returned {}: {}",
                url, status, detail
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Failed(format!("malformed embeddings response: {}", e)))?;
        Ok(parsed.data)
    }

    /// Put each vector at its reported index and check the count and length.
    fn assemble(
        &self,
        records: Vec<VectorRecord>,
        expected: usize,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        if records.len() != expected {
            return Err(EmbeddingError::Failed(format!(
                "asked for {} embeddings, received {}",
                expected,
                records.len()
            )));
        }

        let mut slots: Vec<Option<Embedding>> = vec![None; expected];
        for (position, record) in records.into_iter().enumerate() {
            let index = record.index.unwrap_or(position);
            if record.embedding.len() != self.config.dimension {
                return Err(EmbeddingError::Failed(format!(
                    "expected {}-dimensional vectors, got {}",
                    self.config.dimension,
                    record.embedding.len()
                )));
            }
            let Some(slot) = slots.get_mut(index) else {
                return Err(EmbeddingError::Failed(format!(
                    "embedding index {} out of range",
                    index
                )));
            };
            if slot.is_some() {
                return Err(EmbeddingError::Failed(format!(
                    "duplicate embedding index {}",
                    index
                )));
            }
            *slot = Some(Embedding::new(record.embedding));
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<VectorRecord>,
}

#[derive(Debug, Deserialize)]
struct VectorRecord {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    fn id(&self) -> &str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut batch = self.embed_batch(&[text]).await?;
        batch
            .pop()
            .ok_or_else(|| EmbeddingError::Failed("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(position) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput(format!(
                "text at position {} is blank",
                position
            )));
        }

        let records = self.request(texts).await?;
        let embeddings = self.assemble(records, texts.len())?;
        debug!(
            provider = "openai",
            model = %self.config.model,
            count = embeddings.len(),
            "Embedded batch"
        );
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
