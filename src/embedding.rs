//! Embedding enrichment
//!
//! Records are scored in batches by a remote service. The service takes
//! `{"data": [text, ...]}` and answers `{"embeddings": [[f32, ...], ...]}`,
//! one vector per text in request order, or `{"embeddings": null}` when it
//! has no model configured.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors raised by an embedding call; any of them fails the whole batch
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Embedding request failed: {0}")]
    Http(String),

    #[error("Embedding service returned HTTP {0}")]
    Status(u16),

    #[error("Embedding service returned {got} vectors for {expected} texts")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Malformed embedding response: {0}")]
    Decode(String),
}

/// Batch text scoring
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per text, in input order
    ///
    /// `Ok(None)` means the service is up but produces no vectors.
    async fn embed(&self, texts: &[String]) -> Result<Option<Vec<Vec<f32>>>, EnrichmentError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    data: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Option<Vec<Vec<f32>>>,
}

/// Client for the HTTP embedding service
pub struct HttpEmbedder {
    client: Client,
    url: String,
}

impl HttpEmbedder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichmentError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Option<Vec<Vec<f32>>>, EnrichmentError> {
        debug!("Requesting {} embeddings from {}", texts.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { data: texts })
            .send()
            .await
            .map_err(|e| EnrichmentError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status.as_u16()));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Decode(e.to_string()))?;

        match body.embeddings {
            Some(vectors) if vectors.len() != texts.len() => Err(EnrichmentError::LengthMismatch {
                expected: texts.len(),
                got: vectors.len(),
            }),
            embeddings => Ok(embeddings),
        }
    }
}
