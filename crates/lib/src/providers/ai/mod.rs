pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod workers;

use crate::errors::ModelError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// An image attached to a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A base64 payload with its media type, taken from a `data:` URI.
    Inline { media_type: String, data: String },
    /// Any other URI, passed to the provider as a link.
    Remote(String),
}

impl ImageSource {
    /// Splits a `data:<media-type>;base64,<payload>` URI into its parts.
    ///
    /// Anything that is not a base64 data URI is kept as a remote reference.
    pub fn from_uri(uri: &str) -> Self {
        if let Some((meta, data)) = uri.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
            if let Some(media_type) = meta.strip_suffix(";base64") {
                let media_type = if media_type.is_empty() {
                    "image/jpeg"
                } else {
                    media_type
                };
                return ImageSource::Inline {
                    media_type: media_type.to_string(),
                    data: data.to_string(),
                };
            }
        }
        ImageSource::Remote(uri.to_string())
    }

    /// Reassembles the URI form, as OpenAI-compatible APIs expect it.
    pub fn to_uri(&self) -> String {
        match self {
            ImageSource::Inline { media_type, data } => format!("data:{media_type};base64,{data}"),
            ImageSource::Remote(url) => url.clone(),
        }
    }
}

/// One request to a model: instructions, the user turn, and an optional image.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub image: Option<ImageSource>,
}

/// A trait for interacting with an AI provider.
///
/// Implementations ask their backend for a JSON-only answer where the API
/// supports it and return the raw text of the reply. Parsing and schema
/// validation happen in the caller.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Sends one request and returns the model's raw reply.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError>;

    /// The model identifier this handle calls.
    fn model_name(&self) -> &str;
}

dyn_clone::clone_trait_object!(AiProvider);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_source_splits_data_uri() {
        let source = ImageSource::from_uri("data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(
            source,
            ImageSource::Inline {
                media_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string()
            }
        );
        assert_eq!(source.to_uri(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_image_source_keeps_links_remote() {
        let source = ImageSource::from_uri("https://example.com/scan.jpg");
        assert_eq!(
            source,
            ImageSource::Remote("https://example.com/scan.jpg".to_string())
        );
    }
}
