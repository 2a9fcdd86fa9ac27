use crate::{
    errors::ModelError,
    providers::ai::{AiProvider, GenerationRequest},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    content: Option<String>,
}

// --- Provider implementation ---

/// A provider for OpenAI and OpenAI-compatible chat completion APIs (OpenRouter).
#[derive(Clone, Debug)]
pub struct OpenAiCompatibleProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Creates a new provider posting to the full chat completions `api_url`.
    pub fn new(api_url: String, api_key: Option<String>, model: String) -> Result<Self, ModelError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ModelError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiCompatibleProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let user_content = match &request.image {
            Some(image) => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: request.user_prompt.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.to_uri(),
                    },
                },
            ]),
            None => MessageContent::Text(request.user_prompt.clone()),
        };

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system_prompt.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: 0.0,
            max_tokens: 4096,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            stream: false,
        };

        debug!(model = %self.model, url = %self.api_url, "--> Sending chat completion request");

        let mut request_builder = self.client.post(&self.api_url);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = request_builder
            .json(&request_body)
            .send()
            .await
            .map_err(ModelError::AiRequest)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::AiApi(format!("status {status}: {error_text}")));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(ModelError::AiDeserialization)?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
