//! One-shot indexer: ingests every PDF of a directory

use anyhow::Context;
use clap::Parser;
use rag_workshop::{
    config::Config,
    embedding::EmbeddingClient,
    ingestion::DocumentIngestor,
    observability::init_observability,
    vector_db::{QdrantStore, VectorStore},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "rag-ingest")]
#[command(about = "Ingest every PDF of a directory into the vector store", long_about = None)]
#[command(version)]
struct Args {
    /// Directory to scan for PDF files
    #[arg(default_value = "./data")]
    dir: PathBuf,

    /// Number of files processed at once
    #[arg(short, long, default_value_t = 4)]
    concurrency: usize,

    /// Category stored with every segment
    #[arg(long)]
    category: Option<String>,

    /// Delete and recreate the collection first
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    init_observability(&config.logging.level, &config.logging.format);
    if args.category.is_some() {
        config.ingestion.category = args.category.clone();
    }

    let embedding_client = Arc::new(EmbeddingClient::new(config.embedding.clone())?);
    let store = Arc::new(QdrantStore::new(config.vector_db.clone(), config.embedding.dimension)?);

    if args.reset {
        info!(collection = %config.vector_db.collection, "Deleting collection");
        store.delete_collection(&config.vector_db.collection).await?;
    }

    let ingestor = DocumentIngestor::new(
        &config.ingestion,
        embedding_client,
        store,
        config.vector_db.collection.clone(),
    );
    ingestor.initialize().await?;

    let started = Instant::now();
    let reports = ingestor
        .ingest_directory(&args.dir, args.concurrency)
        .await
        .with_context(|| format!("failed to ingest {}", args.dir.display()))?;

    let segments: usize = reports.iter().map(|r| r.segments).sum();
    info!(
        files = reports.len(),
        segments,
        elapsed_ms = started.elapsed().as_millis(),
        "Ingestion finished"
    );

    Ok(())
}
