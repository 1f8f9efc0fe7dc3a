//! External (device-side) messages.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::headers::{HeaderMap, CONTENT_TYPE_HEADER};

/// Payload of an external message. Exactly one representation is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Textual payload.
    Text(String),
    /// Binary payload (base64-encoded when crossing a JSON boundary).
    Bytes(Vec<u8>),
}

impl Payload {
    /// The textual payload, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    /// The binary payload, if this is a byte payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// A message as seen on the device/transport side, before protocol
/// normalization: headers plus exactly one of a text or byte payload.
///
/// JSON shape (used by fixtures and by script results):
///
/// ```json
/// { "headers": {"device_id": "d1"}, "textPayload": "on", "contentType": "text/plain" }
/// ```
///
/// with `"bytePayload"` carrying base64 in place of `"textPayload"` for
/// binary messages. When `"contentType"` is absent it falls back to the
/// `content-type` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExternalMessageRepr", into = "ExternalMessageRepr")]
pub struct ExternalMessage {
    headers: HeaderMap,
    payload: Payload,
    content_type: Option<String>,
}

impl ExternalMessage {
    /// Start building an external message with the given headers.
    pub fn builder(headers: HeaderMap) -> ExternalMessageBuilder {
        ExternalMessageBuilder {
            headers,
            text: None,
            bytes: None,
            content_type: None,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Content type, falling back to the `content-type` header at build or
    /// decode time.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Decode a generic JSON tree into an external message.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Codec(e.to_string()))
    }

    /// Serialize into a generic JSON tree.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("external message serialization is infallible")
    }
}

/// Builder for [`ExternalMessage`], enforcing the exactly-one-payload rule.
#[derive(Debug, Clone)]
pub struct ExternalMessageBuilder {
    headers: HeaderMap,
    text: Option<String>,
    bytes: Option<Vec<u8>>,
    content_type: Option<String>,
}

impl ExternalMessageBuilder {
    /// Use a text payload, replacing any byte payload set earlier.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.bytes = None;
        self.text = Some(text.into());
        self
    }

    /// Use a byte payload, replacing any text payload set earlier.
    pub fn with_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.text = None;
        self.bytes = Some(bytes.into());
        self
    }

    /// Override the content type instead of deriving it from the headers.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Build the message. Fails with [`Error::MissingPayload`] when no
    /// payload was set.
    pub fn build(self) -> Result<ExternalMessage> {
        let payload = match (self.text, self.bytes) {
            (Some(text), None) => Payload::Text(text),
            (None, Some(bytes)) => Payload::Bytes(bytes),
            _ => return Err(Error::MissingPayload),
        };
        let content_type = self
            .content_type
            .or_else(|| self.headers.get(CONTENT_TYPE_HEADER).map(str::to_owned));

        Ok(ExternalMessage {
            headers: self.headers,
            payload,
            content_type,
        })
    }
}

/// Wire/fixture representation of an external message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalMessageRepr {
    #[serde(default, skip_serializing_if = "HeaderMap::is_empty")]
    headers: HeaderMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    byte_payload: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

impl TryFrom<ExternalMessageRepr> for ExternalMessage {
    type Error = Error;

    fn try_from(repr: ExternalMessageRepr) -> Result<Self> {
        let mut builder = ExternalMessage::builder(repr.headers);
        if let Some(text) = repr.text_payload {
            // Both payload fields present is a malformed message, not a
            // silent preference.
            if repr.byte_payload.is_some() {
                return Err(Error::MissingPayload);
            }
            builder = builder.with_text(text);
        } else if let Some(bytes) = repr.byte_payload {
            builder = builder.with_bytes(bytes);
        }
        if let Some(content_type) = repr.content_type {
            builder = builder.with_content_type(content_type);
        }
        builder.build()
    }
}

impl From<ExternalMessage> for ExternalMessageRepr {
    fn from(message: ExternalMessage) -> Self {
        let (text_payload, byte_payload) = match message.payload {
            Payload::Text(text) => (Some(text), None),
            Payload::Bytes(bytes) => (None, Some(bytes)),
        };
        Self {
            headers: message.headers,
            text_payload,
            byte_payload,
            content_type: message.content_type,
        }
    }
}

mod base64_opt {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_payload() {
        let result = ExternalMessage::builder(HeaderMap::new()).build();
        assert!(matches!(result, Err(Error::MissingPayload)));
    }

    #[test]
    fn test_builder_last_payload_wins() {
        let message = ExternalMessage::builder(HeaderMap::new())
            .with_bytes(vec![1, 2, 3])
            .with_text("hello")
            .build()
            .unwrap();

        assert_eq!(message.payload().as_text(), Some("hello"));
    }

    #[test]
    fn test_content_type_falls_back_to_header() {
        let headers = HeaderMap::from([("Content-Type", "application/json")]);
        let message = ExternalMessage::builder(headers)
            .with_text("{}")
            .build()
            .unwrap();

        assert_eq!(message.content_type(), Some("application/json"));
    }

    #[test]
    fn test_json_round_trip_text() {
        let headers = HeaderMap::from([("device_id", "d1")]);
        let message = ExternalMessage::builder(headers)
            .with_text("21.5")
            .with_content_type("text/plain")
            .build()
            .unwrap();

        let json = message.to_json_value();
        assert_eq!(json["textPayload"], "21.5");
        assert_eq!(json["contentType"], "text/plain");

        let decoded = ExternalMessage::from_json_value(json).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_json_byte_payload_is_base64() {
        let message = ExternalMessage::builder(HeaderMap::new())
            .with_bytes(vec![0xde, 0xad, 0xbe, 0xef])
            .build()
            .unwrap();

        let json = message.to_json_value();
        assert_eq!(json["bytePayload"], "3q2+7w==");

        let decoded = ExternalMessage::from_json_value(json).unwrap();
        assert_eq!(decoded.payload().as_bytes(), Some(&[0xde, 0xad, 0xbe, 0xef][..]));
    }

    #[test]
    fn test_decode_rejects_two_payloads() {
        let result = ExternalMessage::from_json_value(serde_json::json!({
            "textPayload": "a",
            "bytePayload": "YQ==",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_missing_payload() {
        let result = ExternalMessage::from_json_value(serde_json::json!({
            "headers": {"device_id": "d1"},
        }));
        assert!(result.is_err());
    }
}
