//! # Image Inputs
//!
//! Normalizes an uploaded image into the URI form model APIs accept. Callers
//! hand over either raw bytes or a string that is already encoded in some way
//! (a data URI, a remote URL, or bare base64 from a form field).

use crate::errors::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// The prefix given to bare base64 strings whose media type is unknown.
pub const GENERIC_IMAGE_PREFIX: &str = "data:image/jpeg;base64,";

const FALLBACK_MEDIA_TYPE: &str = "image/jpeg";

/// An image as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Raw image bytes.
    Bytes(Vec<u8>),
    /// A URI, or a bare base64 payload.
    Encoded(String),
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        ImageInput::Bytes(bytes.to_vec())
    }
}

impl From<String> for ImageInput {
    fn from(encoded: String) -> Self {
        ImageInput::Encoded(encoded)
    }
}

impl From<&str> for ImageInput {
    fn from(encoded: &str) -> Self {
        ImageInput::Encoded(encoded.to_string())
    }
}

impl ImageInput {
    /// Returns the URI form of this image.
    ///
    /// Strings that already carry a URI scheme pass through untouched, so the
    /// conversion is idempotent. Bare base64 is assumed to be JPEG.
    pub fn to_data_uri(&self) -> Result<String, ExtractError> {
        match self {
            ImageInput::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(ExtractError::InvalidImage("image is empty".to_string()));
                }
                Ok(encode_data_uri(sniff_media_type(bytes), bytes))
            }
            ImageInput::Encoded(encoded) => {
                let encoded = encoded.trim();
                if encoded.is_empty() {
                    return Err(ExtractError::InvalidImage("image is empty".to_string()));
                }
                if has_uri_scheme(encoded) {
                    Ok(encoded.to_string())
                } else {
                    Ok(format!("{GENERIC_IMAGE_PREFIX}{encoded}"))
                }
            }
        }
    }
}

/// Whether `s` starts with `scheme:` as defined by RFC 3986.
///
/// Base64 never contains a colon, so bare payloads are never mistaken for URIs.
pub fn has_uri_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Guesses the media type from magic bytes, defaulting to `image/jpeg`.
pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    ::image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}

/// Encodes bytes as a base64 data URI.
pub fn encode_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

/// Splits a base64 data URI into its media type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), ExtractError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ExtractError::InvalidImage("not a data URI".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExtractError::InvalidImage("data URI has no payload".to_string()))?;
    let media_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| ExtractError::InvalidImage("data URI is not base64-encoded".to_string()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ExtractError::InvalidImage(format!("invalid base64 payload: {e}")))?;
    Ok((media_type.to_string(), bytes))
}
