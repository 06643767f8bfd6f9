//! Input validation for chat requests, uploads and embedding inputs

use tracing::{debug, warn};

/// Maximum text length in bytes sent to the embedding model
const MAX_TEXT_LENGTH: usize = 8192;

/// Maximum accepted length of an uploaded file name
const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum accepted length of a relative source path
const MAX_PATH_LENGTH: usize = 1024;

/// Input validator
pub struct InputValidator;

impl InputValidator {
    /// Validate text input
    pub fn validate_text(text: &str) -> Result<(), ValidationError> {
        if text.trim().is_empty() {
            warn!("Validation failed: empty text");
            return Err(ValidationError::EmptyInput);
        }

        if text.len() > MAX_TEXT_LENGTH {
            warn!("Validation failed: text too long ({} > {})", text.len(), MAX_TEXT_LENGTH);
            return Err(ValidationError::TextTooLong {
                length: text.len(),
                max_length: MAX_TEXT_LENGTH,
            });
        }

        if text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
            warn!("Validation failed: contains control characters");
            return Err(ValidationError::InvalidCharacters);
        }

        debug!("Text validation passed");
        Ok(())
    }

    /// Drop control characters other than whitespace, keeping layout intact
    pub fn strip_control_chars(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .collect()
    }

    /// Sanitize text input
    pub fn sanitize_text(text: &str) -> String {
        Self::strip_control_chars(text).trim().to_string()
    }

    /// Validate sampling parameters of a chat request
    pub fn validate_sampling(temperature: f32, top_p: f32) -> Result<(), ValidationError> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ValidationError::InvalidSampling { name: "temperature", value: temperature });
        }

        if !(0.0..=1.0).contains(&top_p) {
            return Err(ValidationError::InvalidSampling { name: "top_p", value: top_p });
        }

        Ok(())
    }

    /// Validate the name of an uploaded file
    pub fn validate_filename(name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidFilename("empty file name".to_string()));
        }

        if name.len() > MAX_FILENAME_LENGTH {
            return Err(ValidationError::InvalidFilename(format!(
                "file name longer than {} bytes",
                MAX_FILENAME_LENGTH
            )));
        }

        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(ValidationError::InvalidFilename(name.to_string()));
        }

        if name.chars().any(|c| c.is_control()) {
            return Err(ValidationError::InvalidFilename(name.to_string()));
        }

        Ok(())
    }

    /// Validate the source file of stored segments: a file name or a relative
    /// path below the ingested directory, `/` separated
    pub fn validate_source_path(path: &str) -> Result<(), ValidationError> {
        if path.starts_with('/') || path.contains('\\') {
            return Err(ValidationError::InvalidFilename(path.to_string()));
        }

        if path.len() > MAX_PATH_LENGTH {
            return Err(ValidationError::InvalidFilename(format!(
                "path longer than {} bytes",
                MAX_PATH_LENGTH
            )));
        }

        path.split('/').try_for_each(Self::validate_filename)
    }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Text too long: {length} bytes (max: {max_length})")]
    TextTooLong { length: usize, max_length: usize },

    #[error("Text contains invalid control characters")]
    InvalidCharacters,

    #[error("Request contains no user message")]
    MissingUserMessage,

    #[error("Sampling parameter {name} out of range: {value}")]
    InvalidSampling { name: &'static str, value: f32 },

    #[error("Upload contains no files")]
    NoFiles,

    #[error("Invalid file name: {0}")]
    InvalidFilename(String),

    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("Invalid request body: {0}")]
    InvalidRequest(String),
}
