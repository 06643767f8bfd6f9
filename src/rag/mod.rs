//! Retrieval augmented chat

pub mod models;
pub mod service;
pub mod tokens;

pub use models::{
    ChatMessage, ChatRequest, ChatResponse, ChatResponseChunk, Choice, ChunkChoice, ResponseContext, ResponseMessage,
};
pub use service::{ChatService, ChunkStream};
pub use tokens::TokenEstimator;
