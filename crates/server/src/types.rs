use aichart::ExtractOptions;
use serde::{Deserialize, Serialize};

/// The envelope of every successful response.
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: T,
}

/// Body of `POST /extract/image`.
#[derive(Debug, Deserialize)]
pub struct ExtractImageRequest {
    /// A data URI, a URL or bare base64.
    pub image: String,
    pub domain: String,
    /// Total attempts for this image; the server default applies when absent.
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(flatten)]
    pub options: ExtractOptions,
}

/// Body of `POST /extract/pdf`.
#[derive(Debug, Deserialize)]
pub struct ExtractPdfRequest {
    /// The document as base64, optionally as a `data:application/pdf` URI.
    pub pdf_data_base64: String,
    pub domain: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(flatten)]
    pub options: ExtractOptions,
}
