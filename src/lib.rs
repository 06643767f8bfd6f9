//! RAG Workshop - document ingestion and grounded chat over a vector store
//!
//! Two services share this library:
//!
//! - **Ingestion**: PDF and text uploads are parsed into pages, split into
//!   overlapping sections, embedded, and upserted into Qdrant with their
//!   source citation.
//! - **Chat**: the last user question is embedded, the closest sections are
//!   retrieved, and a chat model answers from those sources only.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rag_workshop::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!
//!     let embeddings = Arc::new(EmbeddingClient::new(config.embedding.clone())?);
//!     let store = Arc::new(QdrantStore::new(config.vector_db.clone(), config.embedding.dimension)?);
//!     let model = build_chat_model(&config.llm)?;
//!
//!     let chat = ChatService::new(
//!         embeddings,
//!         store,
//!         model,
//!         config.vector_db.collection.clone(),
//!         config.chat.clone(),
//!     );
//!
//!     let response = chat
//!         .run(ChatRequest::from_question("What is the refund policy?"))
//!         .await?;
//!     println!("{}", response.choices[0].message.content);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod middleware;
pub mod observability;
pub mod rag;
pub mod server;
pub mod vector_db;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{RagError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::document::{DocumentProcessor, TextSegment};
    pub use crate::embedding::{EmbeddingClient, EmbeddingProvider};
    pub use crate::error::{RagError, Result};
    pub use crate::ingestion::DocumentIngestor;
    pub use crate::llm::{build_chat_model, ChatModel};
    pub use crate::observability::HealthChecker;
    pub use crate::rag::{ChatRequest, ChatResponse, ChatService};
    pub use crate::vector_db::{QdrantStore, VectorStore};
}
