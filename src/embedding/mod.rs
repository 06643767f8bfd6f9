//! Embedding service client for an OpenAI-compatible embeddings API

pub mod cache;
pub mod client;
pub mod models;

pub use cache::EmbeddingCache;
pub use client::EmbeddingClient;
pub use models::{Embedding, EmbeddingInput, EmbeddingRequest, EmbeddingResponse};

use async_trait::async_trait;
use crate::error::Result;

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed_single(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Get the dimension of embeddings
    fn embedding_dimension(&self) -> usize;
}
