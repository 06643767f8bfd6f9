//! HTTP embedding client with caching and optional retries

use super::{EmbeddingProvider, EmbeddingCache, models::*};
use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, Result, RagError};
use crate::middleware::InputValidator;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Client for an OpenAI-compatible embeddings endpoint
pub struct EmbeddingClient {
    config: EmbeddingConfig,
    http_client: Client,
    cache: Option<Arc<EmbeddingCache>>,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(EmbeddingError::NetworkError)?;

        Self::with_http_client(config, http_client)
    }

    /// Create client with custom HTTP client
    pub fn with_http_client(config: EmbeddingConfig, http_client: Client) -> Result<Self> {
        let cache = if config.cache_enabled {
            Some(Arc::new(EmbeddingCache::new(
                config.cache_size,
                Duration::from_secs(config.cache_ttl_secs),
            )))
        } else {
            None
        };

        info!(
            url = %config.api_url,
            model = %config.model,
            dimension = config.dimension,
            cache_enabled = config.cache_enabled,
            "Initialized embedding client"
        );

        Ok(Self {
            config,
            http_client,
            cache,
        })
    }

    /// Shared cache, if caching is enabled
    pub fn cache(&self) -> Option<Arc<EmbeddingCache>> {
        self.cache.clone()
    }

    fn backoff(attempt: u32) -> Duration {
        Duration::from_millis(100 * 2_u64.pow(attempt))
    }

    /// Send one request, retrying up to `max_retries` times on transient failures
    async fn make_request(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        let mut attempts = 0;
        let max_retries = self.config.max_retries;

        loop {
            attempts += 1;

            let mut builder = self.http_client.post(&self.config.api_url).json(request);
            if let Some(key) = &self.config.api_key {
                builder = builder.bearer_auth(key.expose_secret());
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    error!("Network error during embedding request: {}", e);
                    if attempts <= max_retries {
                        tokio::time::sleep(Self::backoff(attempts)).await;
                        continue;
                    }
                    return Err(EmbeddingError::NetworkError(e).into());
                }
            };

            let status = response.status();
            if status.is_success() {
                let parsed = response.json::<EmbeddingResponse>().await.map_err(|e| {
                    EmbeddingError::ApiError(format!("Failed to parse response: {}", e))
                })?;
                debug!("Embedding request successful after {} attempts", attempts);
                return Ok(parsed);
            }

            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("Embedding API error {}: {}", status, error_text);

            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(EmbeddingError::AuthenticationFailed.into());
                }
                StatusCode::TOO_MANY_REQUESTS if attempts <= max_retries => {
                    let jitter = Duration::from_millis(rand::random::<u64>() % 1000);
                    let delay = Self::backoff(attempts) * 5 + jitter;
                    warn!("Rate limited, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                s if s.is_server_error() && attempts <= max_retries => {
                    tokio::time::sleep(Self::backoff(attempts)).await;
                    continue;
                }
                _ => {}
            }

            return Err(EmbeddingError::ApiError(format!("API error {}: {}", status, error_text)).into());
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.config.dimension,
                actual: vector.len(),
            }
            .into());
        }
        Ok(())
    }

    fn model(&self) -> Option<String> {
        Some(self.config.model.clone()).filter(|m| !m.is_empty())
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed_single(&self, text: &str) -> Result<Embedding> {
        InputValidator::validate_text(text)?;

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text).await {
                return Ok(cached);
            }
        }

        let request = EmbeddingRequest::single(text, self.model());
        let response = self.make_request(&request).await?;

        let vector = response
            .into_ordered_vectors()
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding(EmbeddingError::ApiError("No embedding in response".to_string())))?;
        self.check_dimension(&vector)?;

        let embedding = Embedding::new(vector);
        if let Some(cache) = &self.cache {
            cache.put(text, embedding.clone()).await;
        }

        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        for text in texts {
            InputValidator::validate_text(text)?;
        }

        let mut results = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.batch_size) {
            let mut batch_results: Vec<(usize, Embedding)> = Vec::with_capacity(chunk.len());
            let mut uncached_texts = Vec::new();
            let mut uncached_indices = Vec::new();

            for (i, text) in chunk.iter().enumerate() {
                let cached = match &self.cache {
                    Some(cache) => cache.get(text).await,
                    None => None,
                };
                match cached {
                    Some(embedding) => batch_results.push((i, embedding)),
                    None => {
                        uncached_texts.push(text.clone());
                        uncached_indices.push(i);
                    }
                }
            }

            if !uncached_texts.is_empty() {
                let sent = uncached_texts.len();
                let request = EmbeddingRequest::batch(uncached_texts, self.model());
                let vectors = self.make_request(&request).await?.into_ordered_vectors();

                if vectors.len() != sent {
                    return Err(EmbeddingError::CountMismatch { sent, received: vectors.len() }.into());
                }

                for (vector, index) in vectors.into_iter().zip(uncached_indices) {
                    self.check_dimension(&vector)?;
                    let embedding = Embedding::new(vector);
                    if let Some(cache) = &self.cache {
                        cache.put(&chunk[index], embedding.clone()).await;
                    }
                    batch_results.push((index, embedding));
                }
            }

            batch_results.sort_by_key(|(index, _)| *index);
            results.extend(batch_results.into_iter().map(|(_, embedding)| embedding));
        }

        debug!("Embedded {} texts", results.len());
        Ok(results)
    }

    fn embedding_dimension(&self) -> usize {
        self.config.dimension
    }
}
