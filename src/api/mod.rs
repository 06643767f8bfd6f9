//! HTTP API of the chat and ingestion services

pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, ChatState, IngestionState, CHAT_GREETING, NDJSON};
pub use routes::{chat_router, ingestion_router};
