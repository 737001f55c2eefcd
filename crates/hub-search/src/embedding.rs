use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::SearchError;

/// Per-call deadline for an embedding request (spec.md §4.5 step 2).
pub const EMBED_CALL_TIMEOUT: Duration = Duration::from_secs(30);
/// Fixed-delay retry count and interval for HTTP-class failures only.
pub const EMBED_RETRY_ATTEMPTS: usize = 3;
pub const EMBED_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Passages/queries are embedded in batches of at most this many texts.
pub const EMBED_BATCH_SIZE: usize = 100;

#[async_trait]
pub trait EmbeddingClient: Send + Sync + 'static {
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let mut out = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        out.pop().ok_or_else(|| SearchError::Embedding("empty response".into()))
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimension: usize,
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponseItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedResponseItem>,
}

/// An HTTP-backed embedding client with the retry policy from spec.md
/// §4.5: up to 3 fixed-delay (1s) retries on HTTP-class errors only.
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(EMBED_CALL_TIMEOUT)
            .build()
            .expect("embedding http client");
        Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
            dimension: self.dimension,
            encoding_format: "float",
        };

        let mut last_err = None;
        for attempt in 0..=EMBED_RETRY_ATTEMPTS {
            match self.http.post(&self.endpoint).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: EmbedResponse = resp
                        .json()
                        .await
                        .map_err(|e| SearchError::Embedding(e.to_string()))?;
                    return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
                }
                Ok(resp) if resp.status().is_client_error() => {
                    // non-retryable: bad request, auth, etc.
                    return Err(SearchError::Embedding(format!(
                        "embedding service rejected request: {}",
                        resp.status()
                    )));
                }
                Ok(resp) => {
                    last_err = Some(format!("embedding service returned {}", resp.status()));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                }
            }
            if attempt < EMBED_RETRY_ATTEMPTS {
                tokio::time::sleep(EMBED_RETRY_DELAY).await;
            }
        }
        Err(SearchError::Embedding(last_err.unwrap_or_else(|| "unknown error".into())))
    }
}
