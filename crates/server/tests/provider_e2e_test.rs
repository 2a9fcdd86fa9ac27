//! # Provider End-to-End Tests
//!
//! Builds the application state from configuration, the way `run` does, with
//! the OpenRouter endpoint pointed at a `wiremock` server.

mod common;

use aichart::Domain;
use aichart_server::{
    config::{AppConfig, ProviderConfig, ProvidersConfig},
    state::build_app_state,
};
use aichart_test_utils::{helpers::generate_test_pdf_pages, record_json};
use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use common::TestApp;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn openrouter_config(base_url: String) -> AppConfig {
    AppConfig {
        default_provider: Some("openrouter".to_string()),
        max_retries: 1,
        providers: ProvidersConfig {
            openrouter: ProviderConfig {
                api_key: Some("or-key".to_string()),
                base_url: Some(base_url),
            },
            ..Default::default()
        },
        ..AppConfig::default()
    }
}

fn chat_reply(content: String) -> Value {
    json!({ "choices": [{ "message": { "content": content } }] })
}

#[tokio::test]
async fn test_image_request_reaches_the_configured_provider() -> Result<()> {
    // --- 1. Arrange ---
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer or-key"))
        .and(body_partial_json(json!({ "model": "google/gemini-2.5-flash" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(record_json(
            Domain::Finance,
            Some("March statement"),
            &[("rent", Some(1200.0))],
        ))))
        .expect(1)
        .mount(&server)
        .await;
    let state = build_app_state(openrouter_config(server.uri())).await?;
    let app = TestApp::spawn_with_state(state).await?;

    // --- 2. Act ---
    let response = app
        .client
        .post(app.url("/extract/image"))
        .json(&json!({
            "image": general_purpose::STANDARD.encode(b"statement-scan"),
            "domain": "finance"
        }))
        .send()
        .await?;

    // --- 3. Assert ---
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["result"]["type"], "finance");
    assert_eq!(body["result"]["title"], "March statement");
    Ok(())
}

#[tokio::test]
async fn test_text_strategy_pdf_sends_page_markers() -> Result<()> {
    // --- 1. Arrange ---
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(record_json(
            Domain::Health,
            None,
            &[("hdl", Some(55.0)), ("ldl", Some(96.0))],
        ))))
        .expect(1)
        .mount(&server)
        .await;
    let state = build_app_state(openrouter_config(server.uri())).await?;
    let app = TestApp::spawn_with_state(state).await?;
    let document = generate_test_pdf_pages(&["HDL 55", "LDL 96"])?;

    // --- 2. Act ---
    let response = app
        .client
        .post(app.url("/extract/pdf"))
        .json(&json!({
            "pdf_data_base64": general_purpose::STANDARD.encode(&document),
            "domain": "health",
            "strategy": "text"
        }))
        .send()
        .await?;

    // --- 3. Assert ---
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["result"]["items"].as_array().map(Vec::len), Some(2));

    let requests = server
        .received_requests()
        .await
        .ok_or_else(|| anyhow::anyhow!("request recording is disabled"))?;
    let sent: Value = serde_json::from_slice(&requests[0].body)?;
    let user_turn = sent["messages"][1]["content"].to_string();
    assert!(user_turn.contains("--- Page 1 ---"));
    assert!(user_turn.contains("--- Page 2 ---"));
    Ok(())
}

#[tokio::test]
async fn test_missing_key_is_reported_as_misconfiguration() -> Result<()> {
    common::setup_tracing();
    // A real key in the environment would make the provider usable.
    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        return Ok(());
    }
    let config = AppConfig {
        default_provider: Some("anthropic".to_string()),
        ..AppConfig::default()
    };
    let app = TestApp::spawn_with_state(build_app_state(config).await?).await?;

    let response = app
        .client
        .post(app.url("/extract/image"))
        .json(&json!({ "image": "aGVsbG8=", "domain": "health" }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Server is not configured correctly.");
    Ok(())
}
