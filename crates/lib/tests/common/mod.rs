#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Scripted model handles and small record builders shared by the
//! integration tests of this crate.

use aichart::{
    errors::{ExtractError, ModelError},
    providers::{
        ai::{AiProvider, GenerationRequest},
        ModelProvider, ProviderKind, ProviderRegistry, ProviderSettings,
    },
};
use async_trait::async_trait;
use dotenvy::dotenv;
use serde_json::{json, Value};
use std::sync::{Arc, Once, RwLock};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

// --- Mock AI Provider for Logic Testing ---

/// Replies with a fixed script of outcomes, one per call, in order.
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    pub call_history: Arc<RwLock<Vec<GenerationRequest>>>,
    responses: Arc<RwLock<Vec<Result<String, String>>>>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// `Err` entries become provider API errors.
    pub fn scripted(responses: Vec<Result<String, String>>) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(responses.into_iter().rev().collect())),
        }
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.call_history.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_history.read().unwrap().len()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        self.call_history.write().unwrap().push(request.clone());
        let next = self.responses.write().unwrap().pop();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ModelError::AiApi(message)),
            None => Err(ModelError::AiApi(
                "MockAiProvider: script exhausted".to_string(),
            )),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Registers a [`MockAiProvider`] in place of a real backend.
pub struct MockModelProvider {
    pub kind: ProviderKind,
    pub handle: MockAiProvider,
}

impl ModelProvider for MockModelProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self, _settings: &ProviderSettings) -> bool {
        true
    }

    fn build(
        &self,
        _model_id: &str,
        _settings: &ProviderSettings,
    ) -> Result<Box<dyn AiProvider>, ExtractError> {
        Ok(Box::new(self.handle.clone()))
    }
}

/// A registry whose default provider is backed by `mock`.
pub fn registry_with(mock: &MockAiProvider) -> Arc<ProviderRegistry> {
    let settings =
        ProviderSettings::default().with_default_provider(Some("openrouter".to_string()));
    let mut registry = ProviderRegistry::new(settings);
    registry.register(Arc::new(MockModelProvider {
        kind: ProviderKind::OpenRouter,
        handle: mock.clone(),
    }));
    Arc::new(registry)
}

// --- Record builders ---

pub fn health_item(key: &str, value: Option<f64>) -> Value {
    json!({
        "key": key,
        "name": key.to_uppercase(),
        "value": value,
        "unit": "10^9/L",
        "status": "normal"
    })
}

pub fn health_record(items: Vec<Value>) -> String {
    json!({
        "type": "health",
        "title": "Complete Blood Count",
        "category": "blood_test",
        "date": "2024-03-01",
        "items": items
    })
    .to_string()
}
