//! Data models for vector database operations

use crate::document::{segment_uuid, TextSegment};
use crate::embedding::Embedding;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Segment and vector to be stored
#[derive(Debug, Clone)]
pub struct SegmentPoint {
    /// Point ID, derived from the segment id
    pub id: Uuid,

    /// Vector embedding
    pub vector: Vec<f32>,

    /// Stored as the point payload
    pub segment: TextSegment,
}

impl SegmentPoint {
    pub fn new(segment: TextSegment, embedding: Embedding) -> Self {
        Self {
            id: segment_uuid(&segment.id),
            vector: embedding.into_inner(),
            segment,
        }
    }
}

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Query vector
    pub vector: Vec<f32>,

    /// Maximum number of results
    pub limit: usize,

    /// Minimum similarity score
    pub score_threshold: Option<f32>,
}

impl SearchParams {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            limit,
            score_threshold: None,
        }
    }

    pub fn with_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }
}

/// Search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSegment {
    pub id: Uuid,

    /// Similarity score
    pub score: f32,

    pub segment: TextSegment,
}
