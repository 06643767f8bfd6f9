//! Text extraction for uploaded documents

use super::models::ContentPage;
use crate::error::{DocumentError, Result};
use crate::middleware::InputValidator;
use std::path::Path;
use tracing::{debug, warn};

pub const PDF: &str = "application/pdf";
pub const PLAIN_TEXT: &str = "text/plain";
pub const MARKDOWN: &str = "text/markdown";
const OCTET_STREAM: &str = "application/octet-stream";

/// Extracts page text from raw document bytes
pub trait DocumentParser: Send + Sync {
    fn parse(&self, filename: &str, data: &[u8]) -> Result<Vec<ContentPage>>;
}

/// PDF text extraction backed by `pdf-extract`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn parse(&self, filename: &str, data: &[u8]) -> Result<Vec<ContentPage>> {
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(data))
            .map_err(|_| DocumentError::ParseFailed {
                filename: filename.to_string(),
                reason: "PDF parser panicked".to_string(),
            })?
            .map_err(|e| DocumentError::ParseFailed {
                filename: filename.to_string(),
                reason: e.to_string(),
            })?;

        let mut pages = Vec::with_capacity(extracted.len());
        let mut offset = 0;
        for (index, text) in extracted.into_iter().enumerate() {
            let mut content = InputValidator::strip_control_chars(&text);
            content.push('\n');
            let length = content.chars().count();
            pages.push(ContentPage {
                content,
                offset,
                page: index as u32 + 1,
            });
            offset += length;
        }

        debug!(filename, pages = pages.len(), "Extracted PDF text");
        Ok(pages)
    }
}

/// UTF-8 passthrough for text and markdown files
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse(&self, filename: &str, data: &[u8]) -> Result<Vec<ContentPage>> {
        let text = std::str::from_utf8(data).map_err(|e| DocumentError::ParseFailed {
            filename: filename.to_string(),
            reason: format!("invalid UTF-8: {}", e),
        })?;

        Ok(vec![ContentPage {
            content: InputValidator::strip_control_chars(text),
            offset: 0,
            page: 0,
        }])
    }
}

/// Content type of an upload, falling back to the file extension when the
/// client sent none or a generic one
pub fn resolve_content_type(filename: &str, declared: Option<&str>) -> String {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != OCTET_STREAM);

    if let Some(content_type) = declared {
        return content_type;
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => PDF,
        Some("txt") => PLAIN_TEXT,
        Some("md") | Some("markdown") => MARKDOWN,
        _ => OCTET_STREAM,
    }
    .to_string()
}

/// Parse a document with the parser matching its content type
pub fn parse_document(filename: &str, data: &[u8], content_type: &str) -> Result<Vec<ContentPage>> {
    let parser: &dyn DocumentParser = match content_type {
        PDF => &PdfParser,
        PLAIN_TEXT | MARKDOWN => &PlainTextParser,
        other => {
            warn!(filename, content_type = other, "Unsupported document type");
            return Err(DocumentError::UnsupportedType {
                filename: filename.to_string(),
                content_type: other.to_string(),
            }
            .into());
        }
    };

    let pages = parser.parse(filename, data)?;
    if pages.iter().all(|p| p.content.trim().is_empty()) {
        return Err(DocumentError::Empty(filename.to_string()).into());
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use crate::testing::minimal_pdf;

    #[test]
    fn test_resolve_content_type() {
        assert_eq!(resolve_content_type("a.pdf", None), PDF);
        assert_eq!(resolve_content_type("a.PDF", Some("application/octet-stream")), PDF);
        assert_eq!(resolve_content_type("notes.md", None), MARKDOWN);
        assert_eq!(resolve_content_type("a.bin", Some("text/plain; charset=utf-8")), PLAIN_TEXT);
        assert_eq!(resolve_content_type("archive.zip", None), OCTET_STREAM);
    }

    #[test]
    fn test_plain_text_passthrough() {
        let pages = parse_document("terms.txt", "Rent is due.\u{0}\n".as_bytes(), PLAIN_TEXT).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].content, "Rent is due.\n");
        assert_eq!(pages[0].page, 0);
    }

    #[test]
    fn test_unsupported_type() {
        let err = parse_document("a.zip", b"PK", "application/zip").unwrap_err();
        assert!(matches!(err, RagError::Document(DocumentError::UnsupportedType { .. })));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_blank_document_is_empty() {
        let err = parse_document("blank.md", b"  \n\t ", MARKDOWN).unwrap_err();
        assert!(matches!(err, RagError::Document(DocumentError::Empty(_))));
    }

    #[test]
    fn test_pdf_pages_carry_numbers_and_offsets() {
        let data = minimal_pdf(&["Rent is due monthly", "Deposits are refundable"]);
        let pages = parse_document("lease.pdf", &data, PDF).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page, 1);
        assert_eq!(pages[1].page, 2);
        assert!(pages[0].content.contains("Rent"));
        assert!(pages[1].content.contains("Deposits"));
        assert!(pages.iter().all(|p| p.content.ends_with('\n')));
        assert_eq!(pages[0].offset, 0);
        assert_eq!(pages[1].offset, pages[0].content.chars().count());
    }

    #[test]
    fn test_garbage_pdf_fails_to_parse() {
        let err = parse_document("broken.pdf", b"definitely not a pdf", PDF).unwrap_err();
        assert!(matches!(err, RagError::Document(DocumentError::ParseFailed { .. })));
        assert!(!err.is_client_error());
    }
}
