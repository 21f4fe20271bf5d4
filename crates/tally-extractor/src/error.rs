//! Error types for the extractor

use thiserror::Error;

/// Errors that can occur during page extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Model provider error
    #[error("Model error: {0}")]
    Model(String),

    /// Page text exceeds maximum length
    #[error("Page text too long: {0} chars (max: {1})")]
    TextTooLong(usize, usize),

    /// Extraction timeout
    #[error("Extraction timeout")]
    Timeout,

    /// Transcription could not be parsed into any structured record
    #[error("Transcription ambiguous: {0}")]
    Ambiguous(String),

    /// Response body was not the expected JSON shape
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}
