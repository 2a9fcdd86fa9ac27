//! # Extraction
//!
//! The structured extraction call and the image extraction service built on it.
//!
//! [`extract_structured`] is the single place a model is asked for a record: it
//! builds the request from a domain profile, waits for the reply under a
//! timeout, strips any markdown fence and validates the result. It never
//! retries. [`Extractor`] resolves model handles from the registry and adds the
//! image entry points, including the retrying one.

pub mod image;
pub mod retry;

use crate::{
    domains::{Domain, DomainProfile},
    errors::{ExtractError, ModelError},
    providers::{
        ai::{AiProvider, GenerationRequest, ImageSource},
        ModelRole, ProviderRegistry, ResolvedModel,
    },
    types::{HierarchyIssue, RecordData},
};
use self::{
    image::ImageInput,
    retry::{RetryFailure, RetryPolicy},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};
use tracing::{debug, info, instrument, warn};

/// Per-request overrides of the model and provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl ExtractOptions {
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// What the model is asked to read.
#[derive(Debug, Clone)]
pub enum ExtractionInput {
    /// An image as a URI, with the user-side instruction sent alongside it.
    Image { data_uri: String, instruction: String },
    /// Plain document text.
    Text(String),
}

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("valid fence pattern")
});

/// Asks `model` for a record and validates the reply against `profile`.
///
/// The call is bounded by `timeout`. Fenced or chatty replies are unwrapped;
/// anything that does not parse into a valid record is an extraction error.
/// Hierarchy and date checks are left to [`report_record_issues`].
#[instrument(skip_all, fields(domain = %profile.domain, model = %model.model_name()))]
pub async fn extract_structured(
    model: &dyn AiProvider,
    profile: &DomainProfile,
    input: ExtractionInput,
    timeout: Duration,
) -> Result<RecordData, ExtractError> {
    let request = match input {
        ExtractionInput::Image {
            data_uri,
            instruction,
        } => GenerationRequest {
            system_prompt: profile.image_system_prompt(),
            user_prompt: instruction,
            image: Some(ImageSource::from_uri(&data_uri)),
        },
        ExtractionInput::Text(text) => GenerationRequest {
            system_prompt: profile.text_system_prompt(),
            user_prompt: text,
            image: None,
        },
    };

    debug!(
        has_image = request.image.is_some(),
        user_prompt_len = request.user_prompt.len(),
        "--> Sending extraction request"
    );

    let raw_response = tokio::time::timeout(timeout, model.generate(&request))
        .await
        .map_err(|_| ModelError::Timeout(timeout))??;

    debug!("<-- Extraction response: {}", raw_response);

    let record = parse_record(&raw_response)?.validate_for(profile)?;

    if !profile.is_known_category(&record.category) {
        warn!(category = %record.category, "Extracted record has an unlisted category");
    }

    info!(items = record.items.len(), "Extraction succeeded");
    Ok(record)
}

/// Logs hierarchy problems and an unusable date on a complete record.
///
/// Neither fails the extraction. Returns the hierarchy issues found.
pub fn report_record_issues(record: &RecordData) -> Vec<HierarchyIssue> {
    let issues = record.hierarchy_issues();
    for issue in &issues {
        warn!(?issue, "Extracted record has a hierarchy issue");
    }
    if let Err(e) = record.parsed_date() {
        warn!("Extracted record has an unusable date: {}", e);
    }
    issues
}

/// Parses a model reply into a record, tolerating markdown fences and prose around the JSON.
pub fn parse_record(raw_response: &str) -> Result<RecordData, ExtractError> {
    let body = JSON_FENCE
        .captures(raw_response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| raw_response.trim());

    let body = if body.starts_with('{') {
        body
    } else {
        match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => &body[start..=end],
            _ => body,
        }
    };

    serde_json::from_str(body).map_err(|e| {
        ExtractError::InvalidResponse(format!("response is not a valid record object: {e}"))
    })
}

/// Resolves model handles and runs image and text extractions.
#[derive(Debug, Clone)]
pub struct Extractor {
    registry: Arc<ProviderRegistry>,
    retry_policy: RetryPolicy,
}

impl Extractor {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the backoff used by [`Extractor::extract_from_image_with_retry`].
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn request_timeout(&self) -> Duration {
        self.registry.settings().request_timeout
    }

    /// Resolves the handle for `role`, honoring the overrides in `options`.
    pub fn resolve_model(
        &self,
        role: ModelRole,
        options: &ExtractOptions,
    ) -> Result<ResolvedModel, ExtractError> {
        self.registry.resolve(
            role,
            options.model_id.as_deref(),
            options.provider.as_deref(),
        )
    }

    /// Extracts a record from one image with the domain's vision model.
    pub async fn extract_from_image(
        &self,
        input: &ImageInput,
        domain: Domain,
        options: &ExtractOptions,
    ) -> Result<RecordData, ExtractError> {
        let model = self.resolve_model(ModelRole::Vision, options)?;
        let record = self
            .extract_image_with(model.handle.as_ref(), input, domain)
            .await?;
        report_record_issues(&record);
        Ok(record)
    }

    /// Extracts a record from one image with an already resolved handle.
    ///
    /// The record is not passed to [`report_record_issues`].
    pub async fn extract_image_with(
        &self,
        model: &dyn AiProvider,
        input: &ImageInput,
        domain: Domain,
    ) -> Result<RecordData, ExtractError> {
        let data_uri = input.to_data_uri()?;
        let profile = domain.profile();
        extract_structured(
            model,
            profile,
            ExtractionInput::Image {
                data_uri,
                instruction: profile.image_instruction(),
            },
            self.request_timeout(),
        )
        .await
    }

    /// Like [`Extractor::extract_from_image`], retried with backoff.
    ///
    /// `max_attempts` overrides the policy's attempt count. The model is
    /// resolved once up front, so configuration problems surface immediately
    /// and are never retried.
    pub async fn extract_from_image_with_retry(
        &self,
        input: &ImageInput,
        domain: Domain,
        max_attempts: Option<u32>,
        options: &ExtractOptions,
    ) -> Result<RecordData, ExtractError> {
        let model = self.resolve_model(ModelRole::Vision, options)?;
        let handle: &dyn AiProvider = model.handle.as_ref();
        let policy = match max_attempts {
            Some(n) => self.retry_policy.with_max_attempts(n),
            None => self.retry_policy,
        };

        let record = policy
            .run(move |attempt| {
                debug!(attempt, %domain, "Image extraction attempt");
                self.extract_image_with(handle, input, domain)
            })
            .await
            .map_err(|failure| match failure {
                RetryFailure::Fatal(e) => e,
                RetryFailure::Exhausted {
                    attempts,
                    last_error,
                } => ExtractError::RetriesExhausted {
                    domain,
                    attempts,
                    last_error: last_error.to_string(),
                },
            })?;
        report_record_issues(&record);
        Ok(record)
    }

    /// Extracts a record from document text with the domain's reasoning model.
    pub async fn extract_from_text(
        &self,
        text: &str,
        domain: Domain,
        options: &ExtractOptions,
    ) -> Result<RecordData, ExtractError> {
        let model = self.resolve_model(ModelRole::Reasoning, options)?;
        let record = extract_structured(
            model.handle.as_ref(),
            domain.profile(),
            ExtractionInput::Text(text.to_string()),
            self.request_timeout(),
        )
        .await?;
        report_record_issues(&record);
        Ok(record)
    }
}
