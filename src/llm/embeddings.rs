// src/llm/embeddings.rs
// Text embedding client. One text in, one fixed-dimension vector out.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CONFIG;
use crate::error::EmbeddingError;
use crate::llm::retry::RetryPolicy;

/// Anything that can turn text into a fixed-dimension vector. The pipeline
/// depends on this, not on the HTTP client, so tests can swap in a fake.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// The fixed dimensionality of every vector this embedder produces.
    fn dimensions(&self) -> usize;
}

/// Request body for the embeddings endpoint.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
    dimensions: usize,
}

/// Response from the embeddings API
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct EmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(retry: RetryPolicy) -> anyhow::Result<Self> {
        let api_key = std::env::var("TUTOR_API_KEY")
            .map_err(|_| anyhow::anyhow!("TUTOR_API_KEY not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(CONFIG.embedding_timeout))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: CONFIG.embedding_model.clone(),
            dimensions: CONFIG.embedding_dimensions,
            timeout_secs: CONFIG.embedding_timeout,
            retry,
        })
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = EmbeddingRequest {
            input: text,
            model: &self.model,
            dimensions: self.dimensions,
        };

        let resp = self
            .client
            .post(CONFIG.api_url("embeddings"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout(self.timeout_secs)
                } else {
                    EmbeddingError::Upstream(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let text = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::RateLimited(text));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Upstream(format!("{}: {}", status, text)));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Malformed("response carried no embedding".into()))?;

        if embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                got: embedding.len(),
                expected: self.dimensions,
            });
        }

        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        // Reject empties before any network call; a silently-embedded empty
        // string would still rank against real content.
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        debug!(target: "embeddings", chars = trimmed.len(), model = %self.model, "embedding text");

        self.retry
            .run("embedding", || self.embed_once(trimmed), EmbeddingError::is_retryable)
            .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Helper functions for working with embeddings
pub mod utils {
    /// Calculate cosine similarity between two embeddings
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

}
