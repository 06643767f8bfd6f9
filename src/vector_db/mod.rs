//! Vector database integration with Qdrant

pub mod client;
pub mod models;

pub use client::QdrantStore;
pub use models::{ScoredSegment, SearchParams, SegmentPoint};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for vector storage operations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if missing; returns whether it was created
    async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<bool>;

    /// Delete a collection
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or overwrite segments
    async fn upsert_segments(&self, collection: &str, points: Vec<SegmentPoint>) -> Result<()>;

    /// Search for similar segments, best first
    async fn search(&self, collection: &str, params: SearchParams) -> Result<Vec<ScoredSegment>>;

    /// Delete every segment that came from `source_file`
    async fn delete_by_source(&self, collection: &str, source_file: &str) -> Result<()>;

    /// Check the store is reachable
    async fn health_check(&self) -> Result<()>;
}
