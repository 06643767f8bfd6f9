//! In-memory collaborators for unit tests

use crate::embedding::{Embedding, EmbeddingProvider};
use crate::error::{Result, VectorDbError};
use crate::llm::{ChatModel, DeltaStream, PromptMessage, SamplingOptions};
use crate::vector_db::{ScoredSegment, SearchParams, SegmentPoint, VectorStore};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Mutex;

/// Embeds every text as a constant vector
pub struct StubEmbeddings {
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddings {
    async fn embed_single(&self, text: &str) -> Result<Embedding> {
        Ok(Embedding::new(vec![text.len() as f32; self.dimension]))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|t| Embedding::new(vec![t.len() as f32; self.dimension]))
            .collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }
}

/// Keeps upserted points and returns them in insertion order on search
#[derive(Default)]
pub struct MemoryStore {
    pub points: Mutex<Vec<SegmentPoint>>,
    pub collections: Mutex<Vec<(String, usize)>>,
    pub searches: Mutex<Vec<SearchParams>>,
    pub unavailable: bool,
}

impl MemoryStore {
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(VectorDbError::ConnectionError("store offline".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<bool> {
        self.check()?;
        let mut collections = self.collections.lock().unwrap();
        if collections.iter().any(|(n, _)| n == name) {
            return Ok(false);
        }
        collections.push((name.to_string(), dimension));
        Ok(true)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.check()?;
        self.collections.lock().unwrap().retain(|(n, _)| n != name);
        Ok(())
    }

    async fn upsert_segments(&self, _collection: &str, points: Vec<SegmentPoint>) -> Result<()> {
        self.check()?;
        let mut stored = self.points.lock().unwrap();
        for point in points {
            stored.retain(|p| p.id != point.id);
            stored.push(point);
        }
        Ok(())
    }

    async fn search(&self, _collection: &str, params: SearchParams) -> Result<Vec<ScoredSegment>> {
        self.check()?;
        let results = self
            .points
            .lock()
            .unwrap()
            .iter()
            .take(params.limit)
            .map(|p| ScoredSegment {
                id: p.id,
                score: 1.0,
                segment: p.segment.clone(),
            })
            .collect();
        self.searches.lock().unwrap().push(params);
        Ok(results)
    }

    async fn delete_by_source(&self, _collection: &str, source_file: &str) -> Result<()> {
        self.check()?;
        self.points.lock().unwrap().retain(|p| p.segment.source_file != source_file);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.check()
    }
}

/// Answers with a fixed text, streamed word by word, and records every prompt
pub struct RecordingModel {
    pub answer: String,
    pub prompts: Mutex<Vec<(Vec<PromptMessage>, SamplingOptions)>>,
}

impl RecordingModel {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for RecordingModel {
    async fn complete(&self, messages: &[PromptMessage], options: &SamplingOptions) -> Result<String> {
        self.prompts.lock().unwrap().push((messages.to_vec(), *options));
        Ok(self.answer.clone())
    }

    async fn complete_stream(&self, messages: &[PromptMessage], options: &SamplingOptions) -> Result<DeltaStream> {
        self.prompts.lock().unwrap().push((messages.to_vec(), *options));
        let words: Vec<Result<String>> = self.answer.split_inclusive(' ').map(|w| Ok(w.to_string())).collect();
        Ok(stream::iter(words).boxed())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// A PDF with one Helvetica text line per page
pub fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages.len())
                .map(|i| format!("{} 0 R", 4 + 2 * i))
                .collect::<Vec<_>>()
                .join(" "),
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref = pdf.len();
    let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        table.push_str(&format!("{:010} 00000 n \n", offset));
    }
    table.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    ));
    pdf.extend_from_slice(table.as_bytes());
    pdf
}
