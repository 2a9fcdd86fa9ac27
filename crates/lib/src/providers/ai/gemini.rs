use crate::{
    errors::ModelError,
    providers::ai::{AiProvider, GenerationRequest, ImageSource},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

// --- Gemini-specific request and response structures ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: &'static str,
    file_uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize, Debug)]
struct PartResponse {
    text: Option<String>,
}

// --- Gemini Provider implementation ---

/// A provider for interacting with the Google Gemini API.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` for `model` under the API root `base_url`.
    pub fn new(base_url: &str, api_key: String, model: String) -> Result<Self, ModelError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ModelError::ReqwestClientBuild)?;
        let api_url = format!(
            "{}/models/{model}:generateContent",
            base_url.trim_end_matches('/')
        );
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }
}

const GEMINI_FILES_PREFIX: &str = "https://generativelanguage.googleapis.com/";

/// `fileData` only resolves uploads made through the File API and Cloud
/// Storage objects. Arbitrary web links are not fetched.
fn is_gemini_file_uri(uri: &str) -> bool {
    uri.starts_with("gs://") || uri.starts_with(GEMINI_FILES_PREFIX)
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let mut parts = Vec::with_capacity(2);
        match &request.image {
            Some(ImageSource::Inline { media_type, data }) => parts.push(Part::Inline {
                inline_data: InlineData {
                    mime_type: media_type.clone(),
                    data: data.clone(),
                },
            }),
            Some(ImageSource::Remote(url)) if is_gemini_file_uri(url) => parts.push(Part::File {
                file_data: FileData {
                    mime_type: "image/jpeg",
                    file_uri: url.clone(),
                },
            }),
            Some(ImageSource::Remote(url)) => {
                return Err(ModelError::UnsupportedImage(format!(
                    "Gemini only accepts File API or gs:// links, got '{url}'"
                )))
            }
            None => {}
        }
        parts.push(Part::Text {
            text: request.user_prompt.clone(),
        });

        let request_body = GeminiRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: request.system_prompt.clone(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };

        debug!(model = %self.model, "--> Sending generateContent request to Gemini");

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await
            .map_err(ModelError::AiRequest)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::AiApi(format!("status {status}: {error_text}")));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(ModelError::AiDeserialization)?;

        let text: String = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
