//! # Application State
//!
//! The shared state handed to every request handler: the configuration and
//! the extraction pipelines built from it. Everything in it is read-only.

use crate::config::AppConfig;
use aichart::{Extractor, ProviderRegistry, RetryPolicy};
use aichart_pdf::PdfExtractor;
use std::sync::Arc;
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub extractor: Extractor,
    pub pdf_extractor: PdfExtractor,
}

impl AppState {
    /// Assembles a state around an already-built PDF pipeline.
    pub fn new(config: AppConfig, pdf_extractor: PdfExtractor) -> Self {
        Self {
            config: Arc::new(config),
            extractor: pdf_extractor.extractor().clone(),
            pdf_extractor,
        }
    }
}

/// Builds the shared application state from the configuration.
///
/// Provider credentials are validated lazily: a missing key only fails the
/// requests that need it.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let settings = config.provider_settings()?;
    let registry = ProviderRegistry::new(settings);
    info!(
        default_provider = %registry.default_provider(),
        "Initialized provider registry."
    );

    let extractor = Extractor::new(Arc::new(registry))
        .with_retry_policy(RetryPolicy::default().with_max_attempts(config.max_retries));
    let pdf_extractor =
        PdfExtractor::new(extractor).with_page_concurrency(config.page_concurrency);

    Ok(AppState::new(config, pdf_extractor))
}
