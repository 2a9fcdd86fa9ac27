use crate::domains::Domain;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a single call to an AI provider.
///
/// These describe transport and provider-side failures. They always surface to
/// callers wrapped in [`ExtractError::Model`], which classifies them as
/// [`ErrorKind::Extraction`].
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("AI provider returned an empty response")]
    EmptyResponse,
    #[error("AI provider cannot read this image reference: {0}")]
    UnsupportedImage(String),
    #[error("Runtime binding call failed: {0}")]
    Binding(String),
    #[error("AI request timed out after {0:?}")]
    Timeout(Duration),
}

/// The coarse classification of an [`ExtractError`].
///
/// Callers branch on the kind, never on the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing credential or binding, unsupported provider or domain. Not retryable.
    Configuration,
    /// The model call failed or its response did not match the record schema.
    Extraction,
    /// PDF page rasterization is unavailable or failed.
    Render,
    /// No page produced a result.
    Merge,
    /// The request was aborted by the caller.
    Cancelled,
}

/// Custom error types for the extraction pipeline.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Model call failed: {0}")]
    Model(#[from] ModelError),
    #[error("Model response did not match the record schema: {0}")]
    InvalidResponse(String),
    #[error("Invalid image input: {0}")]
    InvalidImage(String),
    #[error("Invalid record date: {0}")]
    InvalidDate(String),
    #[error("Failed to extract {domain} data after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        domain: Domain,
        attempts: u32,
        last_error: String,
    },
    #[error("Failed to parse PDF content: {0}")]
    PdfParse(String),
    #[error("Page rendering failed: {0}")]
    Render(String),
    #[error("Failed to merge page results: {0}")]
    Merge(String),
    #[error("Extraction was cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Returns the kind tag attached at the point the error was raised.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Configuration(_) => ErrorKind::Configuration,
            ExtractError::Render(_) => ErrorKind::Render,
            ExtractError::Merge(_) => ErrorKind::Merge,
            ExtractError::Cancelled => ErrorKind::Cancelled,
            ExtractError::Model(_)
            | ExtractError::InvalidResponse(_)
            | ExtractError::InvalidImage(_)
            | ExtractError::InvalidDate(_)
            | ExtractError::RetriesExhausted { .. }
            | ExtractError::PdfParse(_) => ErrorKind::Extraction,
        }
    }

    /// Whether another attempt at the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Extraction
    }
}
