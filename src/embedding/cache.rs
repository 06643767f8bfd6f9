//! Caching layer for embeddings using moka

use super::Embedding;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

/// Statistics about cache contents
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
}

/// Async cache for embeddings keyed by the SHA-256 of the input text
pub struct EmbeddingCache {
    cache: Cache<String, Embedding>,
}

impl EmbeddingCache {
    /// Create a new cache with specified capacity and TTL
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        info!("Initializing embedding cache with max_size={}, ttl={:?}", max_size, ttl);

        let cache = Cache::builder()
            .max_capacity(max_size as u64)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Cache key for a text
    pub fn key_for(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("emb_{:x}", hasher.finalize())
    }

    /// Get embedding for a text
    pub async fn get(&self, text: &str) -> Option<Embedding> {
        let key = Self::key_for(text);
        let result = self.cache.get(&key).await;

        if result.is_some() {
            debug!("Cache hit for key: {}", key);
        }

        result
    }

    /// Store embedding for a text
    pub async fn put(&self, text: &str, embedding: Embedding) {
        self.cache.insert(Self::key_for(text), embedding).await;
    }

    /// Clear all entries
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        info!("Embedding cache cleared");
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;

        CacheStats {
            size: self.cache.entry_count() as usize,
        }
    }
}
