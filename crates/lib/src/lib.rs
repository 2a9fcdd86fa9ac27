//! # AI-Chart Extraction
//!
//! This crate turns a document image or text into a validated, structured
//! record of metrics, using whichever AI provider is configured.
//!
//! - [`providers`] builds model handles for OpenRouter, Google, OpenAI,
//!   Anthropic and Workers AI from explicit [`ProviderSettings`].
//! - [`domains`] holds the static prompt and vocabulary for each [`Domain`].
//! - [`extract`] runs the structured extraction call, plus the image service
//!   with its retrying entry point.
//!
//! PDF handling lives in the `aichart-pdf` crate and the HTTP service in
//! `aichart-server`; both are built on the [`Extractor`] exported here.

pub mod domains;
pub mod errors;
pub mod extract;
pub mod prompts;
pub mod providers;
pub mod types;

pub use domains::{Domain, DomainProfile};
pub use errors::{ErrorKind, ExtractError, ModelError};
pub use extract::{
    extract_structured,
    image::ImageInput,
    parse_record, report_record_issues,
    retry::{RetryFailure, RetryPolicy},
    ExtractOptions, ExtractionInput, Extractor,
};
pub use providers::{
    ModelProvider, ModelRole, ProviderKind, ProviderRegistry, ProviderSettings, ResolvedModel,
};
pub use types::{HierarchyIssue, MetricItem, RecordData};
