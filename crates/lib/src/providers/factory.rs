//! # Provider Registry
//!
//! Turns a logical request (a role plus optional model and provider overrides)
//! into a ready-to-call model handle. Each backend is a [`ModelProvider`]
//! registered under its [`ProviderKind`]; tests swap in their own variants with
//! [`ProviderRegistry::register`].
//!
//! Resolution is synchronous and performs no network calls. Credentials are
//! checked eagerly so a misconfigured deployment fails before any model is
//! contacted.

use crate::{
    errors::ExtractError,
    providers::{
        ai::{
            anthropic::AnthropicProvider, gemini::GeminiProvider,
            openai::OpenAiCompatibleProvider, workers::WorkersAiProvider, AiProvider,
        },
        settings::{ModelRole, ProviderKind, ProviderSettings},
    },
};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};

/// Returns the model used for `role` when the caller names none.
pub fn default_model_id(kind: ProviderKind, role: ModelRole) -> &'static str {
    use ModelRole::*;
    use ProviderKind::*;
    match (kind, role) {
        (OpenRouter, Vision) | (OpenRouter, Reasoning) => "google/gemini-2.5-flash",
        (OpenRouter, Advanced) => "google/gemini-2.5-pro",
        (Google, Vision) | (Google, Reasoning) => "gemini-2.5-flash",
        (Google, Advanced) => "gemini-2.5-pro",
        (OpenAi, Vision) => "gpt-4o",
        (OpenAi, Reasoning) => "o4-mini",
        (OpenAi, Advanced) => "gpt-4.1",
        (Anthropic, Vision) | (Anthropic, Reasoning) => "claude-sonnet-4-20250514",
        (Anthropic, Advanced) => "claude-opus-4-20250514",
        (WorkersAi, Vision) => "@cf/meta/llama-3.2-11b-vision-instruct",
        (WorkersAi, Reasoning) | (WorkersAi, Advanced) => "@cf/meta/llama-3.3-70b-instruct-fp8-fast",
    }
}

/// One backend the registry can build handles for.
pub trait ModelProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether `settings` carry what [`ModelProvider::build`] needs.
    fn is_configured(&self, settings: &ProviderSettings) -> bool {
        settings.has_credential(self.kind())
    }

    /// Builds a handle for `model_id`, or a `Configuration` error naming the missing credential.
    fn build(
        &self,
        model_id: &str,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn AiProvider>, ExtractError>;
}

fn require_api_key(kind: ProviderKind, settings: &ProviderSettings) -> Result<String, ExtractError> {
    settings
        .credentials(kind)
        .and_then(|c| c.api_key.clone())
        .ok_or_else(|| {
            ExtractError::Configuration(format!(
                "{} is not set; it is required to use the '{kind}' provider.",
                kind.credential_name()
            ))
        })
}

/// OpenRouter and OpenAI both speak the chat completions protocol.
struct ChatCompletionsProvider(ProviderKind);

impl ModelProvider for ChatCompletionsProvider {
    fn kind(&self) -> ProviderKind {
        self.0
    }

    fn build(
        &self,
        model_id: &str,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn AiProvider>, ExtractError> {
        let api_key = require_api_key(self.0, settings)?;
        let api_url = format!(
            "{}/chat/completions",
            settings.base_url(self.0).trim_end_matches('/')
        );
        info!("Configuring {} provider with URL: {}", self.0, api_url);
        Ok(Box::new(OpenAiCompatibleProvider::new(
            api_url,
            Some(api_key),
            model_id.to_string(),
        )?))
    }
}

struct GoogleProvider;

impl ModelProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn build(
        &self,
        model_id: &str,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn AiProvider>, ExtractError> {
        let api_key = require_api_key(ProviderKind::Google, settings)?;
        Ok(Box::new(GeminiProvider::new(
            settings.base_url(ProviderKind::Google),
            api_key,
            model_id.to_string(),
        )?))
    }
}

struct AnthropicModelProvider;

impl ModelProvider for AnthropicModelProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn build(
        &self,
        model_id: &str,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn AiProvider>, ExtractError> {
        let api_key = require_api_key(ProviderKind::Anthropic, settings)?;
        Ok(Box::new(AnthropicProvider::new(
            settings.base_url(ProviderKind::Anthropic),
            api_key,
            model_id.to_string(),
        )?))
    }
}

struct WorkersAiModelProvider;

impl ModelProvider for WorkersAiModelProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::WorkersAi
    }

    fn build(
        &self,
        model_id: &str,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn AiProvider>, ExtractError> {
        let binding = settings.workers_binding.clone().ok_or_else(|| {
            ExtractError::Configuration(
                "The 'workers-ai' provider requires a Workers AI binding; none was supplied."
                    .to_string(),
            )
        })?;
        Ok(Box::new(WorkersAiProvider::new(binding, model_id.to_string())))
    }
}

/// A built model handle together with what it was resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub provider: ProviderKind,
    pub model_id: String,
    pub handle: Box<dyn AiProvider>,
}

/// The set of backends available to the pipeline, plus the settings they read.
#[derive(Clone)]
pub struct ProviderRegistry {
    settings: ProviderSettings,
    providers: HashMap<ProviderKind, Arc<dyn ModelProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.providers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("settings", &self.settings)
            .field("providers", &kinds)
            .finish()
    }
}

impl ProviderRegistry {
    /// Creates a registry with every built-in backend registered.
    pub fn new(settings: ProviderSettings) -> Self {
        let mut registry = Self {
            settings,
            providers: HashMap::new(),
        };
        registry.register(Arc::new(ChatCompletionsProvider(ProviderKind::OpenRouter)));
        registry.register(Arc::new(ChatCompletionsProvider(ProviderKind::OpenAi)));
        registry.register(Arc::new(GoogleProvider));
        registry.register(Arc::new(AnthropicModelProvider));
        registry.register(Arc::new(WorkersAiModelProvider));
        registry
    }

    /// Adds `provider`, replacing any backend of the same kind.
    pub fn register(&mut self, provider: Arc<dyn ModelProvider>) -> &mut Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Picks the provider used when a request names none. Never fails.
    pub fn default_provider(&self) -> ProviderKind {
        if let Some(configured) = &self.settings.default_provider {
            match configured.parse::<ProviderKind>() {
                Ok(kind) => return kind,
                Err(_) => warn!(
                    "Configured default provider '{}' is not supported; falling back to detection.",
                    configured
                ),
            }
        }

        ProviderKind::PRIORITY
            .into_iter()
            .find(|kind| {
                self.providers
                    .get(kind)
                    .is_some_and(|p| p.is_configured(&self.settings))
            })
            .unwrap_or(ProviderKind::FALLBACK)
    }

    /// Resolves a role and optional overrides into a ready-to-call handle.
    ///
    /// An explicit `model_id` always wins over the default table. An explicit
    /// `provider` must name a supported backend.
    pub fn resolve(
        &self,
        role: ModelRole,
        model_id: Option<&str>,
        provider: Option<&str>,
    ) -> Result<ResolvedModel, ExtractError> {
        let kind = match provider.map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => name.parse::<ProviderKind>()?,
            None => self.default_provider(),
        };
        let model_id = model_id
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model_id(kind, role))
            .to_string();

        let backend = self.providers.get(&kind).ok_or_else(|| {
            ExtractError::Configuration(format!("unsupported provider: '{kind}'"))
        })?;

        info!(provider = %kind, model = %model_id, ?role, "Resolving model handle");
        let handle = backend.build(&model_id, &self.settings)?;
        Ok(ResolvedModel {
            provider: kind,
            model_id,
            handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_provider_has_a_model_for_every_role() {
        let kinds = [
            ProviderKind::OpenRouter,
            ProviderKind::Google,
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::WorkersAi,
        ];
        for kind in kinds {
            for role in [ModelRole::Vision, ModelRole::Reasoning, ModelRole::Advanced] {
                assert!(!default_model_id(kind, role).is_empty());
            }
        }
    }

    #[test]
    fn test_unsupported_configured_default_is_ignored() {
        let settings = ProviderSettings::default()
            .with_default_provider(Some("mistral".to_string()))
            .with_api_key(ProviderKind::Anthropic, Some("key".to_string()));
        let registry = ProviderRegistry::new(settings);
        assert_eq!(registry.default_provider(), ProviderKind::Anthropic);
    }

    #[test]
    fn test_priority_order_prefers_openrouter() {
        let settings = ProviderSettings::default()
            .with_api_key(ProviderKind::Anthropic, Some("a".to_string()))
            .with_api_key(ProviderKind::OpenRouter, Some("o".to_string()));
        let registry = ProviderRegistry::new(settings);
        assert_eq!(registry.default_provider(), ProviderKind::OpenRouter);
    }
}
