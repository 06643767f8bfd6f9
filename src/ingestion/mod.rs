//! Document ingestion: parse, split, embed and store

use crate::config::IngestionConfig;
use crate::document::{resolve_content_type, DocumentProcessor};
use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, RagError, Result};
use crate::vector_db::{SegmentPoint, VectorStore};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Outcome of ingesting one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub filename: String,
    pub content_type: String,
    pub pages: usize,
    pub segments: usize,
}

/// Writes documents into the vector store collection
pub struct DocumentIngestor {
    processor: DocumentProcessor,
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl DocumentIngestor {
    pub fn new(
        config: &IngestionConfig,
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            processor: DocumentProcessor::new(config),
            embeddings,
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Make sure the collection exists with the embedding dimension
    pub async fn initialize(&self) -> Result<()> {
        let dimension = self.embeddings.embedding_dimension();
        if self.store.ensure_collection(&self.collection, dimension).await? {
            info!(collection = %self.collection, dimension, "Created collection");
        }
        Ok(())
    }

    /// Ingest one uploaded file; an absent or generic content type is
    /// resolved from the file extension
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn ingest_file(&self, filename: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<IngestReport> {
        let started = Instant::now();
        let content_type = resolve_content_type(filename, content_type);

        let processor = self.processor.clone();
        let name = filename.to_string();
        let ct = content_type.clone();
        let document = tokio::task::spawn_blocking(move || processor.process(&name, &data, &ct))
            .await
            .map_err(|e| RagError::Internal(format!("document processing task failed: {}", e)))??;

        let texts: Vec<String> = document.segments.iter().map(|s| s.content.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                sent: texts.len(),
                received: vectors.len(),
            }
            .into());
        }

        // Sections of a previous version of the file would otherwise survive
        // the upsert when the new version is shorter
        self.store.delete_by_source(&self.collection, filename).await?;

        let segment_count = document.segments.len();
        let points: Vec<SegmentPoint> = document
            .segments
            .into_iter()
            .zip(vectors)
            .map(|(segment, vector)| SegmentPoint::new(segment, vector))
            .collect();
        self.store.upsert_segments(&self.collection, points).await?;

        info!(
            filename,
            segments = segment_count,
            latency_ms = started.elapsed().as_millis(),
            "Indexed document"
        );

        Ok(IngestReport {
            filename: filename.to_string(),
            content_type,
            pages: document.pages,
            segments: segment_count,
        })
    }

    /// Remove every segment of a previously ingested file
    pub async fn delete_file(&self, filename: &str) -> Result<()> {
        self.store.delete_by_source(&self.collection, filename).await?;
        info!(filename, "Deleted document segments");
        Ok(())
    }

    /// Ingest every PDF below `dir`, `concurrency` files at a time; stops at
    /// the first failure
    pub async fn ingest_directory(&self, dir: &Path, concurrency: usize) -> Result<Vec<IngestReport>> {
        let files = pdf_files(dir)?;
        info!(dir = %dir.display(), files = files.len(), "Ingesting directory");

        stream::iter(files)
            .map(|path| async move {
                let filename = path
                    .strip_prefix(dir)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                let data = tokio::fs::read(&path).await.map_err(crate::error::DocumentError::from)?;
                self.ingest_file(&filename, data, None).await
            })
            .buffer_unordered(concurrency.max(1))
            .try_collect()
            .await
    }
}

/// PDF files below `dir`, sorted by path
pub fn pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            warn!("Failed to read directory entry: {}", e);
            crate::error::DocumentError::from(std::io::Error::other(e.to_string()))
        })?;

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if entry.file_type().is_file() && is_pdf {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!(count = files.len(), "Found PDF files");
    Ok(files)
}
