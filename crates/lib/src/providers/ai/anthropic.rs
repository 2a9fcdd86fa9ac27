use crate::{
    errors::ModelError,
    providers::ai::{AiProvider, GenerationRequest, ImageSource},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

// --- Messages API request and response structures ---

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageBlockSource },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ImageBlockSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize, Debug)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

// --- Anthropic Provider implementation ---

/// A provider for the Anthropic Messages API.
///
/// The API has no JSON mode; the output contract in the system prompt carries
/// the format, and the caller strips any markdown fence around the reply.
#[derive(Clone, Debug)]
pub struct AnthropicProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    /// Creates a new `AnthropicProvider` under the API root `base_url`.
    pub fn new(base_url: &str, api_key: String, model: String) -> Result<Self, ModelError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ModelError::ReqwestClientBuild)?;
        let api_url = format!("{}/v1/messages", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let mut content = Vec::with_capacity(2);
        if let Some(image) = &request.image {
            let source = match image {
                ImageSource::Inline { media_type, data } => ImageBlockSource::Base64 {
                    media_type: media_type.clone(),
                    data: data.clone(),
                },
                ImageSource::Remote(url) => ImageBlockSource::Url { url: url.clone() },
            };
            content.push(ContentBlock::Image { source });
        }
        content.push(ContentBlock::Text {
            text: request.user_prompt.clone(),
        });

        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens: 4096,
            temperature: 0.0,
            system: &request.system_prompt,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        debug!(model = %self.model, "--> Sending messages request to Anthropic");

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(ModelError::AiRequest)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::AiApi(format!("status {status}: {error_text}")));
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .map_err(ModelError::AiDeserialization)?;

        let text: String = messages_response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
