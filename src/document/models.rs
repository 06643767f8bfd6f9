//! Data models for parsed documents and their sections

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Text of a single page, with its character offset in the whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPage {
    /// Page text, newline terminated for PDFs
    pub content: String,

    /// Offset in characters of this page in the concatenated document text
    pub offset: usize,

    /// Page number (1-based for PDFs, 0 for plain text)
    pub page: u32,
}

/// A section produced by the splitter, before it is given an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub content: String,

    /// Page on which the section starts
    pub page: u32,
}

/// A parsed document ready to be embedded and stored
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub content_type: String,
    pub category: Option<String>,
    pub pages: usize,
    pub segments: Vec<TextSegment>,
}

/// A chunk of source document text with the metadata stored alongside its vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    /// Readable identifier, see [`super::segment_id`]
    pub id: String,

    /// Segment text
    pub content: String,

    /// Optional category supplied at ingestion time
    pub category: Option<String>,

    /// Base name of the originating file, shown as the citation in prompts
    #[serde(rename = "sourcepage")]
    pub source_page: String,

    /// Originating file name, used to delete a file's segments
    #[serde(rename = "sourcefile")]
    pub source_file: String,

    /// Page on which the segment starts
    pub page: u32,

    /// Position of the segment within its document
    pub section: u32,

    /// Unix timestamp (seconds) of ingestion
    pub ingested_at: i64,

    /// Additional metadata
    #[serde(default, flatten)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl TextSegment {
    /// Content with every run of line breaks replaced by one space, as placed
    /// in a prompt's source list
    pub fn single_line_content(&self) -> String {
        let mut line = String::with_capacity(self.content.len());
        let mut in_break = false;
        for c in self.content.chars() {
            if c == '\r' || c == '\n' {
                if !in_break {
                    line.push(' ');
                }
                in_break = true;
            } else {
                line.push(c);
                in_break = false;
            }
        }
        line
    }

    /// `"{sourcepage}: {content}"` source line used when building prompts
    pub fn source_line(&self) -> String {
        format!("{}: {}", self.source_page, self.single_line_content())
    }
}
