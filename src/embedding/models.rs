//! Data models for embedding requests and responses

use serde::{Deserialize, Serialize};

/// Fixed-length vector produced by the embedding model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self(vector)
    }

    pub fn vector(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vector: Vec<f32>) -> Self {
        Self(vector)
    }
}

/// Request body for an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Input text(s) to embed
    pub input: EmbeddingInput,

    /// Model name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Input variants for embedding requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

/// Response from embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// Generated embeddings
    pub data: Vec<EmbeddingData>,

    /// Model used for generation
    #[serde(default)]
    pub model: Option<String>,

    /// Usage statistics (not every runtime reports them)
    #[serde(default)]
    pub usage: Option<UsageStats>,
}

/// Individual embedding data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    /// Embedding vector
    pub embedding: Vec<f32>,

    /// Index in the batch
    #[serde(default)]
    pub index: usize,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    pub prompt_tokens: usize,
    pub total_tokens: usize,
}

impl EmbeddingRequest {
    /// Create a request for a single text
    pub fn single(text: impl Into<String>, model: Option<String>) -> Self {
        Self {
            input: EmbeddingInput::Single(text.into()),
            model,
        }
    }

    /// Create a request for multiple texts
    pub fn batch(texts: Vec<String>, model: Option<String>) -> Self {
        Self {
            input: EmbeddingInput::Batch(texts),
            model,
        }
    }
}

impl EmbeddingResponse {
    /// Vectors in request order, regardless of the order the server listed them
    pub fn into_ordered_vectors(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}
