//! # Application Configuration
//!
//! Defines the configuration of `aichart-server` and loads it in layers:
//!
//! 1. Programmatic defaults.
//! 2. `config.yml`, with `${VAR}` placeholders replaced from the environment.
//! 3. Plain environment variables for top-level keys such as `PORT`.
//! 4. `AICHART_`-prefixed variables for nested keys
//!    (e.g. `AICHART_PROVIDERS__GOOGLE__API_KEY`).
//!
//! Provider credentials that no layer sets are taken from the library's own
//! environment variables (`GOOGLE_API_KEY`, `AI_PROVIDER`, ...).

use aichart::{
    providers::{ai::workers::CloudflareRestBinding, ProviderKind, ProviderSettings},
    ExtractError,
};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::{env, fs, path::Path, sync::Arc, time::Duration};
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The provider used when a request does not name one.
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Overrides the per-call model timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Attempts per image when a request does not set `max_retries`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// The most attempts a request may ask for with `max_retries`.
    #[serde(default = "default_max_retries_limit")]
    pub max_retries_limit: u32,
    /// How many PDF pages are extracted at once.
    #[serde(default = "default_page_concurrency")]
    pub page_concurrency: usize,
    /// Aborts a PDF extraction that runs longer than this.
    #[serde(default)]
    pub pdf_timeout_secs: Option<u64>,
    /// The largest accepted request body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
}

fn default_port() -> u16 {
    9090
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_retries_limit() -> u32 {
    10
}

fn default_page_concurrency() -> usize {
    aichart_pdf::DEFAULT_PAGE_CONCURRENCY
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            default_provider: None,
            request_timeout_secs: None,
            max_retries: default_max_retries(),
            max_retries_limit: default_max_retries_limit(),
            page_concurrency: default_page_concurrency(),
            pdf_timeout_secs: None,
            max_upload_bytes: default_max_upload_bytes(),
            providers: ProvidersConfig::default(),
            cloudflare: CloudflareConfig::default(),
        }
    }
}

/// Credentials for every HTTP provider.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openrouter: ProviderConfig,
    #[serde(default)]
    pub google: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub anthropic: ProviderConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the provider's public endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// The Workers AI REST binding. Both fields are needed to enable it.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CloudflareConfig {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl AppConfig {
    /// Caps a client-requested attempt count at `max_retries_limit`.
    pub fn attempts_for_request(&self, requested: Option<u32>) -> Option<u32> {
        requested.map(|n| n.min(self.max_retries_limit))
    }

    /// Builds the library's provider settings from this configuration.
    ///
    /// Values set here win over the library's environment variables.
    pub fn provider_settings(&self) -> Result<ProviderSettings, ExtractError> {
        let mut settings = ProviderSettings::from_env()?;

        if let Some(provider) = present(&self.default_provider) {
            settings.default_provider = Some(provider);
        }
        for (kind, provider) in [
            (ProviderKind::OpenRouter, &self.providers.openrouter),
            (ProviderKind::Google, &self.providers.google),
            (ProviderKind::OpenAi, &self.providers.openai),
            (ProviderKind::Anthropic, &self.providers.anthropic),
        ] {
            if let Some(api_key) = present(&provider.api_key) {
                settings = settings.with_api_key(kind, Some(api_key));
            }
            if let Some(base_url) = present(&provider.base_url) {
                settings = settings.with_base_url(kind, Some(base_url));
            }
        }
        if let Some(secs) = self.request_timeout_secs {
            settings = settings.with_request_timeout(Duration::from_secs(secs));
        }
        if let (Some(account_id), Some(api_token)) = (
            present(&self.cloudflare.account_id),
            present(&self.cloudflare.api_token),
        ) {
            let binding = CloudflareRestBinding::new(
                present(&self.cloudflare.base_url).as_deref(),
                account_id,
                api_token,
            )
            .map_err(|e| ExtractError::Configuration(e.to_string()))?;
            settings = settings.with_workers_binding(Arc::new(binding));
        }

        Ok(settings)
    }

    /// The deadline after which a PDF extraction is aborted, if any.
    pub fn pdf_timeout(&self) -> Option<Duration> {
        self.pdf_timeout_secs.map(Duration::from_secs)
    }
}

// Reads a file and substitutes `${VAR}` placeholders with environment values.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// With `config_path_override`, that file must exist. Otherwise `config.yml`
/// next to this crate's manifest is used when present.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults.
        .set_default("port", i64::from(default_port()))?
        .set_default("max_retries", i64::from(default_max_retries()))?
        .set_default("max_retries_limit", i64::from(default_max_retries_limit()))?;

    // Layer 2: The YAML file.
    let content = match config_path_override {
        Some(path) => {
            let content = read_and_substitute(path)?.ok_or_else(|| {
                ConfigError::NotFound(format!("Config file not found at '{path}'."))
            })?;
            info!("Loading configuration from '{path}'.");
            Some(content)
        }
        None => {
            let default_path = format!("{}/config.yml", env!("CARGO_MANIFEST_DIR"));
            let content = read_and_substitute(&default_path)?;
            match &content {
                Some(_) => info!("Loading configuration from '{default_path}'."),
                None => info!("'{default_path}' not found. Using defaults and environment."),
            }
            content
        }
    };
    if let Some(content) = content {
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        // Layer 3: Environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Layer 4: Prefixed environment variables for nested overrides.
        .add_source(
            Environment::with_prefix("AICHART")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
