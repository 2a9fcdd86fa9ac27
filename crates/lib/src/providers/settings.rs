//! # Provider Settings
//!
//! Credentials and endpoints for every supported provider, gathered once per
//! process and passed to the registry by value. [`ProviderSettings::from_env`]
//! is the only place the environment is read.

use crate::{
    errors::ExtractError,
    providers::ai::workers::{CloudflareRestBinding, WorkersAiBinding},
};
use std::{env, fmt, str::FromStr, sync::Arc, time::Duration};

/// Default timeout applied to a single model call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The AI backends the registry knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenRouter,
    Google,
    OpenAi,
    Anthropic,
    WorkersAi,
}

impl ProviderKind {
    /// Providers probed, in order, when no default is configured.
    pub const PRIORITY: [ProviderKind; 4] = [
        ProviderKind::OpenRouter,
        ProviderKind::Google,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
    ];

    /// Used when no configured provider has a credential.
    pub const FALLBACK: ProviderKind = ProviderKind::OpenRouter;

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Google => "google",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::WorkersAi => "workers-ai",
        }
    }

    /// The name of the credential this provider needs, as operators configure it.
    pub fn credential_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::Google => "GOOGLE_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::WorkersAi => "Workers AI binding",
        }
    }

    /// The API root used when no base URL override is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Google => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::WorkersAi => crate::providers::ai::workers::CLOUDFLARE_API_BASE_URL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "google" | "gemini" => Ok(ProviderKind::Google),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "workers-ai" | "workers_ai" | "workersai" | "cloudflare" => {
                Ok(ProviderKind::WorkersAi)
            }
            _ => Err(ExtractError::Configuration(format!(
                "unsupported provider: '{s}'"
            ))),
        }
    }
}

/// The job a model handle is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    /// Reads images.
    Vision,
    /// Structures plain text.
    Reasoning,
    /// Heavier analysis where cost matters less.
    Advanced,
}

/// The API key and optional endpoint override for one provider.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Read-only provider configuration shared by every request.
#[derive(Clone)]
pub struct ProviderSettings {
    /// The provider named by configuration, if any. Validated at resolution time.
    pub default_provider: Option<String>,
    pub openrouter: ProviderCredentials,
    pub google: ProviderCredentials,
    pub openai: ProviderCredentials,
    pub anthropic: ProviderCredentials,
    pub workers_binding: Option<Arc<dyn WorkersAiBinding>>,
    pub request_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            default_provider: None,
            openrouter: ProviderCredentials::default(),
            google: ProviderCredentials::default(),
            openai: ProviderCredentials::default(),
            anthropic: ProviderCredentials::default(),
            workers_binding: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("default_provider", &self.default_provider)
            .field("openrouter", &self.openrouter)
            .field("google", &self.google)
            .field("openai", &self.openai)
            .field("anthropic", &self.anthropic)
            .field("workers_binding", &self.workers_binding.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Treats unset and empty values alike; `${VAR}` substitution yields "" for unset variables.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_value(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

impl ProviderSettings {
    /// Builds settings from environment variables.
    ///
    /// Reads `AI_PROVIDER`, `OPENROUTER_API_KEY`, `GOOGLE_API_KEY` (or
    /// `GOOGLE_GENERATIVE_AI_API_KEY`), `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
    /// `CLOUDFLARE_ACCOUNT_ID` with `CLOUDFLARE_API_TOKEN`, and
    /// `AI_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ExtractError> {
        let mut settings = Self {
            default_provider: env_value("AI_PROVIDER"),
            ..Self::default()
        }
        .with_api_key(ProviderKind::OpenRouter, env_value("OPENROUTER_API_KEY"))
        .with_api_key(
            ProviderKind::Google,
            env_value("GOOGLE_API_KEY").or_else(|| env_value("GOOGLE_GENERATIVE_AI_API_KEY")),
        )
        .with_api_key(ProviderKind::OpenAi, env_value("OPENAI_API_KEY"))
        .with_api_key(ProviderKind::Anthropic, env_value("ANTHROPIC_API_KEY"));

        if let Some(raw) = env_value("AI_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                ExtractError::Configuration(format!(
                    "AI_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                ))
            })?;
            settings.request_timeout = Duration::from_secs(secs);
        }

        if let (Some(account_id), Some(api_token)) = (
            env_value("CLOUDFLARE_ACCOUNT_ID"),
            env_value("CLOUDFLARE_API_TOKEN"),
        ) {
            let binding = CloudflareRestBinding::new(None, account_id, api_token)
                .map_err(|e| ExtractError::Configuration(e.to_string()))?;
            settings.workers_binding = Some(Arc::new(binding));
        }

        Ok(settings)
    }

    pub fn with_default_provider(mut self, provider: Option<String>) -> Self {
        self.default_provider = non_empty(provider);
        self
    }

    /// Sets the API key for `kind`. Empty keys count as absent.
    pub fn with_api_key(mut self, kind: ProviderKind, api_key: Option<String>) -> Self {
        if let Some(credentials) = self.credentials_mut(kind) {
            credentials.api_key = non_empty(api_key);
        }
        self
    }

    /// Overrides the API root for `kind`.
    pub fn with_base_url(mut self, kind: ProviderKind, base_url: Option<String>) -> Self {
        if let Some(credentials) = self.credentials_mut(kind) {
            credentials.base_url = non_empty(base_url);
        }
        self
    }

    pub fn with_workers_binding(mut self, binding: Arc<dyn WorkersAiBinding>) -> Self {
        self.workers_binding = Some(binding);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Key-based credentials for `kind`; `None` for binding-based providers.
    pub fn credentials(&self, kind: ProviderKind) -> Option<&ProviderCredentials> {
        match kind {
            ProviderKind::OpenRouter => Some(&self.openrouter),
            ProviderKind::Google => Some(&self.google),
            ProviderKind::OpenAi => Some(&self.openai),
            ProviderKind::Anthropic => Some(&self.anthropic),
            ProviderKind::WorkersAi => None,
        }
    }

    fn credentials_mut(&mut self, kind: ProviderKind) -> Option<&mut ProviderCredentials> {
        match kind {
            ProviderKind::OpenRouter => Some(&mut self.openrouter),
            ProviderKind::Google => Some(&mut self.google),
            ProviderKind::OpenAi => Some(&mut self.openai),
            ProviderKind::Anthropic => Some(&mut self.anthropic),
            ProviderKind::WorkersAi => None,
        }
    }

    /// Whether the credential (or binding) `kind` needs is present.
    pub fn has_credential(&self, kind: ProviderKind) -> bool {
        match self.credentials(kind) {
            Some(credentials) => credentials.api_key.is_some(),
            None => self.workers_binding.is_some(),
        }
    }

    /// The configured API root for `kind`, or its public default.
    pub fn base_url(&self, kind: ProviderKind) -> &str {
        self.credentials(kind)
            .and_then(|c| c.base_url.as_deref())
            .unwrap_or_else(|| kind.default_base_url())
    }
}
