//! # Workers AI
//!
//! Workers AI is called through a runtime binding rather than an API key. Hosts
//! that run inside the edge runtime supply their own [`WorkersAiBinding`];
//! everything else can use [`CloudflareRestBinding`], which calls the same
//! models over the public REST API.

use crate::{
    errors::ModelError,
    providers::ai::{AiProvider, GenerationRequest},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{fmt::Debug, sync::Arc};
use tracing::debug;

pub const CLOUDFLARE_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// The runtime object that executes a Workers AI model.
#[async_trait]
pub trait WorkersAiBinding: Send + Sync + Debug {
    /// Runs `model` with the given input and returns the model's output object.
    async fn run(&self, model: &str, input: Value) -> Result<Value, ModelError>;
}

/// A Workers AI binding backed by the Cloudflare REST API.
#[derive(Clone)]
pub struct CloudflareRestBinding {
    client: ReqwestClient,
    base_url: String,
    account_id: String,
    api_token: String,
}

impl Debug for CloudflareRestBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareRestBinding")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize, Debug)]
struct RestEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    errors: Vec<Value>,
}

impl CloudflareRestBinding {
    pub fn new(
        base_url: Option<&str>,
        account_id: String,
        api_token: String,
    ) -> Result<Self, ModelError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ModelError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(CLOUDFLARE_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            account_id,
            api_token,
        })
    }
}

#[async_trait]
impl WorkersAiBinding for CloudflareRestBinding {
    async fn run(&self, model: &str, input: Value) -> Result<Value, ModelError> {
        let url = format!(
            "{}/accounts/{}/ai/run/{model}",
            self.base_url, self.account_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&input)
            .send()
            .await
            .map_err(ModelError::AiRequest)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::AiApi(format!("status {status}: {error_text}")));
        }

        let envelope: RestEnvelope = response
            .json()
            .await
            .map_err(ModelError::AiDeserialization)?;
        if !envelope.success {
            return Err(ModelError::Binding(format!(
                "Workers AI reported failure: {:?}",
                envelope.errors
            )));
        }
        Ok(envelope.result)
    }
}

/// A model handle that runs through a [`WorkersAiBinding`].
#[derive(Clone, Debug)]
pub struct WorkersAiProvider {
    binding: Arc<dyn WorkersAiBinding>,
    model: String,
}

impl WorkersAiProvider {
    pub fn new(binding: Arc<dyn WorkersAiBinding>, model: String) -> Self {
        Self { binding, model }
    }
}

#[async_trait]
impl AiProvider for WorkersAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let user_content = match &request.image {
            Some(image) => json!([
                { "type": "text", "text": request.user_prompt },
                { "type": "image_url", "image_url": { "url": image.to_uri() } }
            ]),
            None => json!(request.user_prompt),
        };
        let input = json!({
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": user_content }
            ],
            "response_format": { "type": "json_object" },
            "max_tokens": 4096,
            "temperature": 0.0
        });

        debug!(model = %self.model, "--> Running Workers AI model");
        let output = self.binding.run(&self.model, input).await?;

        // Text models answer with a string; JSON mode may hand back the object itself.
        match output.get("response") {
            Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
            Some(value @ Value::Object(_)) => Ok(value.to_string()),
            _ => Err(ModelError::EmptyResponse),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
