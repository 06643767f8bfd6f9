//! Error types for the RAG workshop services

use thiserror::Error;

pub use crate::middleware::ValidationError;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Main error type for the ingestion and chat services
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RagError {
    /// Whether the error was caused by the caller's input rather than a collaborator
    pub fn is_client_error(&self) -> bool {
        match self {
            RagError::Validation(_) => true,
            RagError::Document(e) => matches!(
                e,
                DocumentError::UnsupportedType { .. } | DocumentError::Empty(_)
            ),
            _ => false,
        }
    }
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Embedding count mismatch: sent {sent} texts, received {received} vectors")]
    CountMismatch { sent: usize, received: usize },
}

/// Errors related to vector database operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Collection error: {0}")]
    CollectionError(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Insert error: {0}")]
    InsertError(String),

    #[error("Delete error: {0}")]
    DeleteError(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Errors related to chat completion backends
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),

    #[error("invalid API key header: {0}")]
    InvalidApiKey(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
        snippet: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("completion returned no choices")]
    EmptyChoices,

    #[error("stream failed: {0}")]
    Stream(String),
}

/// Errors related to document loading and splitting
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Unsupported file type '{content_type}' for {filename}")]
    UnsupportedType { filename: String, content_type: String },

    #[error("Failed to parse {filename}: {reason}")]
    ParseFailed { filename: String, reason: String },

    #[error("No text could be extracted from {0}")]
    Empty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for RagError {
    fn from(err: config::ConfigError) -> Self {
        RagError::Config(err.to_string())
    }
}
