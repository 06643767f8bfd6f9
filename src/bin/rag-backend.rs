//! Chat service: answers questions grounded in the ingested documents

use anyhow::Context;
use clap::Parser;
use rag_workshop::{
    api::{chat_router, ChatState},
    config::Config,
    embedding::EmbeddingClient,
    llm::build_chat_model,
    observability::{init_observability, HealthChecker},
    rag::ChatService,
    server::serve,
    vector_db::QdrantStore,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "rag-backend")]
#[command(about = "RAG workshop chat service", long_about = None)]
#[command(version)]
struct Args {
    /// Port to listen on (defaults to the configured server port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    init_observability(&config.logging.level, &config.logging.format);
    info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        qdrant = %config.vector_db.url,
        collection = %config.vector_db.collection,
        "Starting chat service"
    );

    let embedding_client = Arc::new(EmbeddingClient::new(config.embedding.clone())?);
    let store = Arc::new(QdrantStore::new(config.vector_db.clone(), config.embedding.dimension)?);
    let model = build_chat_model(&config.llm)?;

    let health_checker = Arc::new(
        HealthChecker::new("rag-backend")
            .with_vector_db(store.clone())
            .with_embedding_client(embedding_client.clone())
            .with_cache(embedding_client.cache())
            .with_llm(model.name()),
    );

    let chat = Arc::new(ChatService::new(
        embedding_client,
        store,
        model,
        config.vector_db.collection.clone(),
        config.chat.clone(),
    ));

    let router = chat_router(
        ChatState { chat, health_checker },
        config.server.max_body_size_mb * 1024 * 1024,
    );

    serve(router, &config.server.host, args.port.unwrap_or(config.server.port)).await
}
