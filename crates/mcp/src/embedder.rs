//! HTTP-backed embedders and the provider factory.
//!
//! `OllamaEmbedder` talks to `/api/embed`; `OpenAiEmbedder` talks to any
//! OpenAI-compatible `/embeddings` endpoint and retries throttling and server
//! errors with capped exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use draftdesk_core::config::{EmbeddingConfig, EmbeddingProvider};
use draftdesk_core::embedding::{Embedder, EmbeddingError, EmbeddingModelInfo, HashingEmbedder};

const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(250);
const MAX_BACKOFF_SHIFT: u32 = 5;

/// Builds the embedder selected by `config.provider`.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbeddingProvider::Hashing => {
            Arc::new(HashingEmbedder::new(config.model.clone(), config.dimensions))
        }
        EmbeddingProvider::Ollama => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                EmbeddingError::InvalidInput("ollama provider requires a base_url".to_string())
            })?;
            Arc::new(OllamaEmbedder::new(
                base_url,
                &config.model,
                config.dimensions,
                Duration::from_secs(config.timeout_secs),
                config.batch_size,
            )?)
        }
        EmbeddingProvider::OpenAi => {
            let api_key = config.api_key.as_ref().ok_or_else(|| {
                EmbeddingError::InvalidInput("openai provider requires an api_key".to_string())
            })?;
            let base_url = config.base_url.as_deref().unwrap_or("https://api.openai.com/v1");
            Arc::new(OpenAiEmbedder::new(
                api_key.expose_secret(),
                base_url,
                &config.model,
                config.dimensions,
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
                config.batch_size,
            )?)
        }
    };

    let info = embedder.model_info();
    info!(
        event_name = "embedding.provider.ready",
        provider = ?config.provider,
        model = %info.model,
        dimensions = info.dimensions,
        "embedding provider ready"
    );
    Ok(embedder)
}

fn ensure_inputs(texts: &[String]) -> Result<(), EmbeddingError> {
    if let Some(index) = texts.iter().position(|text| text.trim().is_empty()) {
        return Err(EmbeddingError::InvalidInput(format!("input {index} is blank")));
    }
    Ok(())
}

fn ensure_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<(), EmbeddingError> {
    match vectors.iter().find(|vector| vector.len() != expected) {
        Some(vector) => {
            Err(EmbeddingError::DimensionMismatch { expected, actual: vector.len() })
        }
        None => Ok(()),
    }
}

fn transport_error(error: reqwest::Error) -> EmbeddingError {
    EmbeddingError::Transport(error.to_string())
}

/// Embedder backed by an Ollama server.
#[derive(Clone, Debug)]
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(timeout).build().map_err(transport_error)?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
        })
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = OllamaEmbedRequest { model: &self.model, input: texts };

        let response =
            self.client.post(&self.endpoint).json(&request).send().await.map_err(|error| {
                warn!(
                    event_name = "embedding.ollama.transport",
                    error = %error,
                    "failed to reach ollama"
                );
                transport_error(error)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status: status.as_u16(), body });
        }

        let parsed: OllamaEmbedResponse =
            response.json().await.map_err(|error| EmbeddingError::Decode(error.to_string()))?;
        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::Decode(format!(
                "ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_info(&self) -> EmbeddingModelInfo {
        EmbeddingModelInfo { model: self.model.clone(), dimensions: self.dimensions }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        ensure_inputs(texts)?;

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_chunk(batch).await?);
        }

        ensure_dimensions(&vectors, self.dimensions)?;
        debug!(count = vectors.len(), model = %self.model, "ollama embeddings received");
        Ok(vectors)
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedder for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone, Debug)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    send_dimensions: bool,
    max_retries: u32,
    batch_size: usize,
    retry_base: Duration,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
        max_retries: u32,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("missing OpenAI API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| EmbeddingError::InvalidInput("invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
            send_dimensions: supports_dimensions(model),
            max_retries,
            batch_size: batch_size.max(1),
            retry_base: DEFAULT_RETRY_BASE,
        })
    }

    /// Overrides the first backoff delay; later retries double it.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut attempt = 0u32;
        loop {
            let request = OpenAiEmbeddingRequest {
                model: &self.model,
                input: texts,
                dimensions: self.send_dimensions.then_some(self.dimensions),
            };

            let error = match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    let mut parsed: OpenAiEmbeddingResponse = response
                        .json()
                        .await
                        .map_err(|error| EmbeddingError::Decode(error.to_string()))?;
                    parsed.data.sort_by_key(|entry| entry.index);
                    if parsed.data.len() != texts.len() {
                        return Err(EmbeddingError::Decode(format!(
                            "embedding endpoint returned {} vectors for {} inputs",
                            parsed.data.len(),
                            texts.len()
                        )));
                    }
                    return Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect());
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if !should_retry(status) {
                        return Err(EmbeddingError::Status { status: status.as_u16(), body });
                    }
                    EmbeddingError::Status { status: status.as_u16(), body }
                }
                Err(error) if is_retryable(&error) => transport_error(error),
                Err(error) => return Err(transport_error(error)),
            };

            if attempt >= self.max_retries {
                return Err(error);
            }
            attempt += 1;
            let delay = self.retry_backoff(attempt);
            warn!(
                event_name = "embedding.openai.retry",
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying embedding request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn retry_backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.retry_base * (1u32 << shift)
    }
}

/// Only the `text-embedding-3` family accepts a `dimensions` field; older
/// models and most compatible servers reject it.
fn supports_dimensions(model: &str) -> bool {
    model.trim().starts_with("text-embedding-3")
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_info(&self) -> EmbeddingModelInfo {
        EmbeddingModelInfo { model: self.model.clone(), dimensions: self.dimensions }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        ensure_inputs(texts)?;

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_chunk(batch).await?);
        }

        ensure_dimensions(&vectors, self.dimensions)?;
        Ok(vectors)
    }
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
