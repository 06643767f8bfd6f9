//! Document parsing, splitting and segment identity

pub mod models;
pub mod parser;
pub mod splitter;

pub use models::{ContentPage, Document, Section, TextSegment};
pub use parser::{parse_document, resolve_content_type, DocumentParser, PdfParser, PlainTextParser};
pub use splitter::TextSplitter;

use crate::config::IngestionConfig;
use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Stable identifier of a file: ASCII-safe name plus the hex of the raw name
pub fn filename_to_id(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("file-{}-{}", ascii, hex::encode(filename.as_bytes()))
}

/// Readable identifier of a section of a file
pub fn segment_id(filename: &str, page: u32, section: usize) -> String {
    format!("{}-page-{}-section-{}", filename_to_id(filename), page, section)
}

/// Vector store point id for a segment id; identical inputs map to the same point
pub fn segment_uuid(segment_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, segment_id.as_bytes())
}

/// Turns raw uploads into identified text segments
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    splitter: TextSplitter,
    category: Option<String>,
}

impl DocumentProcessor {
    pub fn new(config: &IngestionConfig) -> Self {
        Self {
            splitter: TextSplitter::new(config),
            category: config.category.clone(),
        }
    }

    /// Parse, split and label a document
    pub fn process(&self, filename: &str, data: &[u8], content_type: &str) -> Result<Document> {
        let pages = parse_document(filename, data, content_type)?;
        let sections = self.splitter.split(&pages);

        let source_page = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename)
            .to_string();
        let ingested_at = chrono::Utc::now().timestamp();

        let segments: Vec<TextSegment> = sections
            .into_iter()
            .enumerate()
            .map(|(index, section)| TextSegment {
                id: segment_id(filename, section.page, index),
                content: section.content,
                category: self.category.clone(),
                source_page: source_page.clone(),
                source_file: filename.to_string(),
                page: section.page,
                section: index as u32,
                ingested_at,
                metadata: HashMap::new(),
            })
            .collect();

        info!(
            filename,
            content_type,
            pages = pages.len(),
            segments = segments.len(),
            "Processed document"
        );

        Ok(Document {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            category: self.category.clone(),
            pages: pages.len(),
            segments,
        })
    }
}
