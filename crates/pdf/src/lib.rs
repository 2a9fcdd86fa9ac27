//! # aichart-pdf: PDF Extraction Pipeline
//!
//! Turns a PDF into one merged record. Two strategies are available:
//!
//! - **vision** renders every page to PNG and extracts each page image
//!   concurrently, then merges the page records in page order.
//! - **text** reads the PDF's text layer and makes a single structured call.
//!
//! The requested strategy runs first. If it fails with an extraction or render
//! error, the other strategy runs once and its outcome is final.

pub mod merge;
pub mod render;
pub mod text;

use aichart::{
    providers::ModelRole, report_record_issues, Domain, ErrorKind, ExtractError, ExtractOptions,
    Extractor, ImageInput, RecordData,
};
use futures::{
    future::{AbortRegistration, Abortable},
    stream, StreamExt, TryStreamExt,
};
use render::{default_renderer, PageRenderer, RENDER_SCALE};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{info, instrument, warn};

pub use merge::merge_page_records;

/// How many page images are extracted at once.
pub const DEFAULT_PAGE_CONCURRENCY: usize = 4;

/// Which reading of the document is tried first.
#[derive(Debug, Deserialize, Serialize, Default, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PdfStrategy {
    #[default]
    Vision,
    Text,
}

impl PdfStrategy {
    /// The strategy used as the fallback for this one.
    pub fn other(self) -> Self {
        match self {
            PdfStrategy::Vision => PdfStrategy::Text,
            PdfStrategy::Text => PdfStrategy::Vision,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PdfStrategy::Vision => "vision",
            PdfStrategy::Text => "text",
        }
    }
}

impl fmt::Display for PdfStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PdfStrategy {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vision" => Ok(PdfStrategy::Vision),
            "text" => Ok(PdfStrategy::Text),
            _ => Err(ExtractError::Configuration(format!(
                "unsupported PDF strategy: '{s}'"
            ))),
        }
    }
}

/// Options for one PDF extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfExtractOptions {
    #[serde(default)]
    pub strategy: PdfStrategy,
    #[serde(flatten)]
    pub model: ExtractOptions,
}

impl PdfExtractOptions {
    pub fn with_strategy(mut self, strategy: PdfStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Runs the PDF pipeline on top of an [`Extractor`].
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    extractor: Extractor,
    renderer: Arc<dyn PageRenderer>,
    page_concurrency: usize,
}

impl PdfExtractor {
    /// Creates a pipeline with the default renderer for this build.
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor,
            renderer: default_renderer(),
            page_concurrency: DEFAULT_PAGE_CONCURRENCY,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_page_concurrency(mut self, page_concurrency: usize) -> Self {
        self.page_concurrency = page_concurrency.max(1);
        self
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Extracts one merged record from `pdf_data`.
    ///
    /// Configuration, merge and cancellation errors are returned as they are;
    /// extraction and render errors trigger one run of the other strategy.
    #[instrument(skip(self, pdf_data, options), fields(bytes = pdf_data.len(), strategy = %options.strategy))]
    pub async fn extract_from_pdf(
        &self,
        pdf_data: &[u8],
        domain: Domain,
        options: &PdfExtractOptions,
    ) -> Result<RecordData, ExtractError> {
        let primary = options.strategy;
        match self
            .run_strategy(primary, pdf_data, domain, &options.model)
            .await
        {
            Ok(record) => Ok(record),
            Err(e) if matches!(e.kind(), ErrorKind::Extraction | ErrorKind::Render) => {
                let fallback = primary.other();
                warn!(
                    "The {} strategy failed ({}); falling back to {}.",
                    primary, e, fallback
                );
                self.run_strategy(fallback, pdf_data, domain, &options.model)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`PdfExtractor::extract_from_pdf`], stopped early when `registration`
    /// is aborted. In-flight page calls are dropped and the result is
    /// [`ExtractError::Cancelled`].
    pub async fn extract_from_pdf_abortable(
        &self,
        pdf_data: &[u8],
        domain: Domain,
        options: &PdfExtractOptions,
        registration: AbortRegistration,
    ) -> Result<RecordData, ExtractError> {
        match Abortable::new(self.extract_from_pdf(pdf_data, domain, options), registration).await
        {
            Ok(result) => result,
            Err(_aborted) => {
                info!("PDF extraction was cancelled by the caller.");
                Err(ExtractError::Cancelled)
            }
        }
    }

    async fn run_strategy(
        &self,
        strategy: PdfStrategy,
        pdf_data: &[u8],
        domain: Domain,
        options: &ExtractOptions,
    ) -> Result<RecordData, ExtractError> {
        match strategy {
            PdfStrategy::Vision => self.extract_vision(pdf_data, domain, options).await,
            PdfStrategy::Text => self.extract_text(pdf_data, domain, options).await,
        }
    }

    /// The vision path: render, extract each page image, merge.
    pub async fn extract_vision(
        &self,
        pdf_data: &[u8],
        domain: Domain,
        options: &ExtractOptions,
    ) -> Result<RecordData, ExtractError> {
        let model = self.extractor.resolve_model(ModelRole::Vision, options)?;
        let mut pages = self.renderer.render_pages(pdf_data, RENDER_SCALE).await?;
        info!("Rendered {} page(s) for the vision path.", pages.len());

        let record = match pages.len() {
            0 => return Err(ExtractError::Merge("the document has no pages".to_string())),
            1 => {
                let page = pages.remove(0);
                self.extractor
                    .extract_image_with(model.handle.as_ref(), &ImageInput::Bytes(page.png), domain)
                    .await?
            }
            _ => {
                let extractor = &self.extractor;
                let handle = model.handle.as_ref();
                let records: Vec<RecordData> = stream::iter(pages)
                    .map(move |page| async move {
                        let index = page.index;
                        extractor
                            .extract_image_with(handle, &ImageInput::Bytes(page.png), domain)
                            .await
                            .inspect_err(|e| warn!("Page {} failed: {}", index + 1, e))
                    })
                    .buffered(self.page_concurrency)
                    .try_collect()
                    .await?;
                merge_page_records(records)?
            }
        };

        // Parents may sit on a different page than their children.
        report_record_issues(&record);
        Ok(record)
    }

    /// The text path: read the text layer, make one structured call.
    pub async fn extract_text(
        &self,
        pdf_data: &[u8],
        domain: Domain,
        options: &ExtractOptions,
    ) -> Result<RecordData, ExtractError> {
        let pdf_owned = pdf_data.to_vec();
        let pages = tokio::task::spawn_blocking(move || text::extract_page_texts(&pdf_owned))
            .await
            .map_err(|e| ExtractError::PdfParse(format!("text extraction task failed: {e}")))??;

        if pages.is_empty() {
            return Err(ExtractError::Merge("the document has no pages".to_string()));
        }
        if pages.iter().all(|page| page.trim().is_empty()) {
            return Err(ExtractError::PdfParse(
                "the document has no extractable text".to_string(),
            ));
        }

        info!("Extracted text from {} page(s) for the text path.", pages.len());
        self.extractor
            .extract_from_text(&text::join_pages(&pages), domain, options)
            .await
    }
}
