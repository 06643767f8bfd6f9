//! Ingestion service: accepts document uploads and indexes them

use anyhow::Context;
use clap::Parser;
use rag_workshop::{
    api::{ingestion_router, IngestionState},
    config::Config,
    embedding::EmbeddingClient,
    ingestion::DocumentIngestor,
    observability::{init_observability, HealthChecker},
    server::serve,
    vector_db::QdrantStore,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rag-ingestion")]
#[command(about = "RAG workshop document ingestion service", long_about = None)]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "INGESTION_PORT", default_value_t = 3001)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    init_observability(&config.logging.level, &config.logging.format);
    info!(
        qdrant = %config.vector_db.url,
        collection = %config.vector_db.collection,
        embedding_model = %config.embedding.model,
        "Starting ingestion service"
    );

    let embedding_client = Arc::new(EmbeddingClient::new(config.embedding.clone())?);
    let store = Arc::new(QdrantStore::new(config.vector_db.clone(), config.embedding.dimension)?);

    let ingestor = Arc::new(DocumentIngestor::new(
        &config.ingestion,
        embedding_client.clone(),
        store.clone(),
        config.vector_db.collection.clone(),
    ));
    if let Err(e) = ingestor.initialize().await {
        warn!("Collection not ready yet, will retry on first upload: {}", e);
    }

    let health_checker = Arc::new(
        HealthChecker::new("rag-ingestion")
            .with_vector_db(store)
            .with_embedding_client(embedding_client),
    );

    let router = ingestion_router(
        IngestionState { ingestor, health_checker },
        config.server.max_body_size_mb * 1024 * 1024,
    );

    serve(router, &config.server.host, args.port).await
}
