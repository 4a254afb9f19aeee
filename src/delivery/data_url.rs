//! `data:` URL encoding for artifacts crossing the page/host boundary.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::DeliveryError;

pub const PNG_MIME: &str = "image/png";
pub const PDF_MIME: &str = "application/pdf";

/// Encode bytes as `data:<mime>;base64,<payload>`.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Decode a base64 payload, accepting either a full data URL or bare base64.
///
/// The mime prefix is not checked; whatever precedes the first comma is
/// discarded.
pub fn decode(value: &str) -> Result<Vec<u8>, DeliveryError> {
    let payload = match value.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| DeliveryError::DeliveryFailed("malformed data URL".to_string()))?,
        None => value,
    };

    STANDARD
        .decode(payload.trim())
        .map_err(|e| DeliveryError::DeliveryFailed(format!("invalid base64 payload: {}", e)))
}

/// Serde adapter storing PNG bytes as a data URL string.
pub mod png_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(super::PNG_MIME, bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::decode(&value).map_err(D::Error::custom)
    }
}
