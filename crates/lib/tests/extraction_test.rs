//! # Structured Extraction Tests
//!
//! Drives the image and text entry points against a scripted model.

mod common;

use aichart::{
    errors::{ErrorKind, ExtractError, ModelError},
    providers::{
        ai::{AiProvider, GenerationRequest, ImageSource},
        ProviderKind, ProviderRegistry, ProviderSettings,
    },
    Domain, ExtractOptions, Extractor, ImageInput,
};
use async_trait::async_trait;
use common::{health_item, health_record, registry_with, setup_tracing, MockAiProvider, MockModelProvider};
use serde_json::json;
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn test_image_extraction_sends_prompt_and_image() {
    setup_tracing();
    // --- 1. Arrange ---
    let mock = MockAiProvider::new(vec![health_record(vec![
        health_item("wbc", Some(5.2)),
        health_item("rbc", Some(4.7)),
    ])]);
    let extractor = Extractor::new(registry_with(&mock));
    let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();

    // --- 2. Act ---
    let record = extractor
        .extract_from_image(&ImageInput::Bytes(png), Domain::Health, &ExtractOptions::default())
        .await
        .unwrap();

    // --- 3. Assert ---
    assert_eq!(record.record_type, Domain::Health);
    let keys: Vec<_> = record.items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["wbc", "rbc"]);

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0]
        .system_prompt
        .starts_with(Domain::Health.profile().image_prompt));
    assert!(calls[0]
        .user_prompt
        .starts_with("Extract all health metrics from this image strictly"));
    match &calls[0].image {
        Some(ImageSource::Inline { media_type, .. }) => assert_eq!(media_type, "image/png"),
        other => panic!("expected an inline image, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unlisted_category_is_kept() {
    // --- 1. Arrange ---
    let reply = json!({
        "type": "health",
        "category": "allergy_panel",
        "date": "2024-03-01",
        "items": [health_item("ige", Some(120.0))]
    })
    .to_string();
    let mock = MockAiProvider::new(vec![reply]);
    let extractor = Extractor::new(registry_with(&mock));

    // --- 2. Act ---
    let record = extractor
        .extract_from_image(&"aGVsbG8=".into(), Domain::Health, &ExtractOptions::default())
        .await
        .unwrap();

    // --- 3. Assert ---
    assert!(!Domain::Health.profile().is_known_category("allergy_panel"));
    assert_eq!(record.category, "allergy_panel");
}

#[tokio::test]
async fn test_fenced_response_is_unwrapped() {
    let fenced = format!(
        "```json\n{}\n```",
        health_record(vec![health_item("hgb", Some(13.9))])
    );
    let mock = MockAiProvider::new(vec![fenced]);
    let extractor = Extractor::new(registry_with(&mock));

    let record = extractor
        .extract_from_image(&"aGVsbG8=".into(), Domain::Health, &ExtractOptions::default())
        .await
        .unwrap();

    assert_eq!(record.items[0].key, "hgb");
    assert_eq!(record.items[0].value, Some(13.9));
}

#[tokio::test]
async fn test_malformed_response_is_an_extraction_error() {
    let mock = MockAiProvider::new(vec!["Sorry, I can't read this image.".to_string()]);
    let extractor = Extractor::new(registry_with(&mock));

    let err = extractor
        .extract_from_image(&"aGVsbG8=".into(), Domain::Health, &ExtractOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(matches!(err, ExtractError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_record_for_another_domain_is_rejected() {
    let mock = MockAiProvider::new(vec![health_record(vec![])]);
    let extractor = Extractor::new(registry_with(&mock));

    let err = extractor
        .extract_from_image(&"aGVsbG8=".into(), Domain::Finance, &ExtractOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(err.to_string().contains("finance"));
}

#[tokio::test]
async fn test_statuses_are_normalized_and_checked() {
    // --- 1. Arrange ---
    let mut shouting = health_item("ldl", Some(4.1));
    shouting["status"] = json!(" HIGH ");
    let mut foreign = health_item("rent", Some(1200.0));
    foreign["status"] = json!("expense");
    let mock = MockAiProvider::new(vec![
        health_record(vec![shouting]),
        health_record(vec![foreign]),
    ]);
    let extractor = Extractor::new(registry_with(&mock));
    let image: ImageInput = "aGVsbG8=".into();

    // --- 2. Act ---
    let normalized = extractor
        .extract_from_image(&image, Domain::Health, &ExtractOptions::default())
        .await
        .unwrap();
    let rejected = extractor
        .extract_from_image(&image, Domain::Health, &ExtractOptions::default())
        .await;

    // --- 3. Assert ---
    assert_eq!(normalized.items[0].status, "high");
    assert_eq!(rejected.unwrap_err().kind(), ErrorKind::Extraction);
}

#[tokio::test]
async fn test_text_extraction_uses_the_text_prompt() {
    let finance = json!({
        "type": "finance",
        "category": "utility_bill",
        "date": "2024-05-31",
        "summary": "1,284.50",
        "items": [
            {"key": "electricity", "name": "Electricity", "value": "84.50", "status": "expense"}
        ]
    })
    .to_string();
    let mock = MockAiProvider::new(vec![finance]);
    let extractor = Extractor::new(registry_with(&mock));

    let record = extractor
        .extract_from_text(
            "Electricity ... 84.50\nTotal due 1,284.50",
            Domain::Finance,
            &ExtractOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(record.summary, Some(1284.5));
    assert_eq!(record.items[0].value, Some(84.5));
    let calls = mock.calls();
    assert!(calls[0].image.is_none());
    assert!(calls[0]
        .system_prompt
        .starts_with(Domain::Finance.profile().text_prompt));
    assert!(calls[0].user_prompt.contains("Total due"));
}

#[tokio::test]
async fn test_unknown_provider_override_fails_before_any_call() {
    let mock = MockAiProvider::new(vec![]);
    let extractor = Extractor::new(registry_with(&mock));

    let err = extractor
        .extract_from_image(
            &"aGVsbG8=".into(),
            Domain::Health,
            &ExtractOptions::default().with_provider("mistral"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(mock.call_count(), 0);
}

// --- Timeout ---

#[derive(Clone, Debug)]
struct StalledProvider;

#[async_trait]
impl AiProvider for StalledProvider {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ModelError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(String::new())
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}

struct StalledModelProvider;

impl aichart::ModelProvider for StalledModelProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn build(
        &self,
        _model_id: &str,
        _settings: &ProviderSettings,
    ) -> Result<Box<dyn AiProvider>, ExtractError> {
        Ok(Box::new(StalledProvider))
    }
}

#[tokio::test(start_paused = true)]
async fn test_model_call_times_out() {
    // --- 1. Arrange ---
    let settings = ProviderSettings::default()
        .with_default_provider(Some("google".to_string()))
        .with_request_timeout(Duration::from_secs(5));
    let mut registry = ProviderRegistry::new(settings);
    registry.register(Arc::new(StalledModelProvider));
    let extractor = Extractor::new(Arc::new(registry));

    // --- 2. Act ---
    let err = extractor
        .extract_from_image(&"aGVsbG8=".into(), Domain::Health, &ExtractOptions::default())
        .await
        .unwrap_err();

    // --- 3. Assert ---
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(matches!(err, ExtractError::Model(ModelError::Timeout(_))));
}

#[tokio::test]
async fn test_mock_registration_does_not_leak_between_kinds() {
    let mock = MockAiProvider::new(vec![]);
    let mut registry = ProviderRegistry::new(ProviderSettings::default());
    registry.register(Arc::new(MockModelProvider {
        kind: ProviderKind::Anthropic,
        handle: mock,
    }));
    let extractor = Extractor::new(Arc::new(registry));

    // OpenAI still uses the built-in variant, which has no key.
    let err = extractor
        .extract_from_text("text", Domain::Health, &ExtractOptions::default().with_provider("openai"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
