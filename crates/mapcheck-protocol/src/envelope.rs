//! Normalized protocol envelope.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::headers::HeaderMap;

/// The normalized, topic-addressed message representation used by the
/// platform after mapping.
///
/// JSON shape:
///
/// ```json
/// { "topic": "d1/things/twin/commands/modify",
///   "path": "/features/environment/properties",
///   "value": {"temperature": 21.5},
///   "headers": {"content-type": "application/json"},
///   "status": 204 }
/// ```
///
/// `value` and `status` are omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    /// Topic the envelope is addressed to.
    pub topic: String,
    /// Path within the addressed entity.
    pub path: String,
    /// Payload value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Envelope headers.
    #[serde(default, skip_serializing_if = "HeaderMap::is_empty")]
    pub headers: HeaderMap,
    /// Response status code, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
}

impl ProtocolMessage {
    /// Create an envelope with the given topic and path and no value,
    /// headers, or status.
    pub fn new(topic: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            path: path.into(),
            value: None,
            headers: HeaderMap::new(),
            status: None,
        }
    }

    /// Set the payload value.
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Replace the envelope headers. Fixture tests use this to overlay the
    /// test's headers onto a parsed expected envelope.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the status code.
    pub fn with_status(mut self, status: i64) -> Self {
        self.status = Some(status);
        self
    }

    /// Decode a generic JSON tree into an envelope.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Codec(e.to_string()))
    }

    /// Parse an envelope from JSON text.
    pub fn from_json_text(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Codec(e.to_string()))
    }

    /// Serialize into a generic JSON tree.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("protocol message serialization is infallible")
    }
}
