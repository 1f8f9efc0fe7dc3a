//! Typed two-directional mapping over a loaded script.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use mapcheck_protocol::{ExternalMessage, HeaderMap, Payload, ProtocolMessage};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::host::ScriptHost;
use crate::script::{EntryPoint, ScriptHandle};

/// Binds one loaded mapping script to the incoming/outgoing roles.
///
/// Stateless beyond the script handle: each call builds a fresh execution
/// context, so calls are independent and may be repeated in any order.
/// Reuse within one test case is fine; concurrent invocation of one host
/// is not supported.
#[derive(Debug, Clone)]
pub struct MappingFunction {
    host: ScriptHost,
    handle: ScriptHandle,
}

impl MappingFunction {
    /// Load a mapping function from JavaScript source with a default host.
    pub fn from_javascript(source: &str) -> Result<Self> {
        Self::with_host(ScriptHost::default(), source)
    }

    /// Load a mapping function on the given host.
    pub fn with_host(host: ScriptHost, source: &str) -> Result<Self> {
        let handle = host.load(source)?;
        Ok(Self { host, handle })
    }

    pub fn handle(&self) -> &ScriptHandle {
        &self.handle
    }

    /// Map a device-side message into a protocol envelope via
    /// `mapFromExternal(headers, textPayload, bytePayload, contentType)`.
    pub fn map_incoming(&self, message: &ExternalMessage) -> Result<ProtocolMessage> {
        let result = self.host.invoke(
            &self.handle,
            EntryPoint::FromExternal,
            incoming_args(message),
        )?;
        ProtocolMessage::from_json_value(result).map_err(|e| Error::InvalidResult(e.to_string()))
    }

    /// Map a protocol envelope into a device-side message via
    /// `mapToExternal(topic, path, value, headers, status)`.
    pub fn map_outgoing(&self, message: &ProtocolMessage) -> Result<ExternalMessage> {
        let result =
            self.host
                .invoke(&self.handle, EntryPoint::ToExternal, outgoing_args(message))?;
        ExternalMessage::from_json_value(result).map_err(|e| Error::InvalidResult(e.to_string()))
    }
}

fn headers_json(headers: &HeaderMap) -> Value {
    let mut object = serde_json::Map::new();
    for (key, value) in headers.iter() {
        object.insert(key.to_string(), Value::String(value.to_string()));
    }
    Value::Object(object)
}

fn incoming_args(message: &ExternalMessage) -> Vec<Value> {
    // Exactly one of textPayload/bytePayload is non-null; bytes cross the
    // boundary base64-encoded.
    let (text_payload, byte_payload) = match message.payload() {
        Payload::Text(text) => (Value::String(text.clone()), Value::Null),
        Payload::Bytes(bytes) => (Value::Null, Value::String(BASE64.encode(bytes))),
    };
    let content_type = message
        .content_type()
        .map(|c| Value::String(c.to_string()))
        .unwrap_or(Value::Null);

    vec![
        headers_json(message.headers()),
        text_payload,
        byte_payload,
        content_type,
    ]
}

fn outgoing_args(message: &ProtocolMessage) -> Vec<Value> {
    let status = message
        .status
        .map(|s| Value::Number(s.into()))
        .unwrap_or(Value::Null);

    vec![
        Value::String(message.topic.clone()),
        Value::String(message.path.clone()),
        message.value.clone().unwrap_or(Value::Null),
        headers_json(&message.headers),
        status,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn external(text: &str) -> ExternalMessage {
        let headers = HeaderMap::from([("content-type", "text/plain"), ("device_id", "d1")]);
        ExternalMessage::builder(headers).with_text(text).build().unwrap()
    }

    #[test]
    fn test_incoming_args_shape() {
        let args = incoming_args(&external("hello"));

        assert_eq!(args[0], json!({"content-type": "text/plain", "device_id": "d1"}));
        assert_eq!(args[1], json!("hello"));
        assert_eq!(args[2], Value::Null);
        assert_eq!(args[3], json!("text/plain"));
    }

    #[test]
    fn test_incoming_args_bytes_are_base64() {
        let message = ExternalMessage::builder(HeaderMap::new())
            .with_bytes(vec![1, 2, 3])
            .build()
            .unwrap();
        let args = incoming_args(&message);

        assert_eq!(args[1], Value::Null);
        assert_eq!(args[2], json!("AQID"));
    }

    #[test]
    fn test_outgoing_args_shape() {
        let envelope = ProtocolMessage::new("d1/topic", "/features")
            .with_value(json!({"on": true}))
            .with_status(204);
        let args = outgoing_args(&envelope);

        assert_eq!(args[0], json!("d1/topic"));
        assert_eq!(args[1], json!("/features"));
        assert_eq!(args[2], json!({"on": true}));
        assert_eq!(args[3], json!({}));
        assert_eq!(args[4], json!(204));
    }

    #[test]
    fn test_map_incoming_end_to_end() {
        let function = MappingFunction::from_javascript(
            "function mapFromExternal(headers, textPayload, bytePayload, contentType) {\
               return {\
                 topic: headers['device_id'] + '/telemetry',\
                 path: '/features',\
                 value: JSON.parse(textPayload),\
                 headers: headers\
               };\
             }",
        )
        .unwrap();

        let envelope = function.map_incoming(&external("{\"temperature\":21.5}")).unwrap();

        assert_eq!(envelope.topic, "d1/telemetry");
        assert_eq!(envelope.value, Some(json!({"temperature": 21.5})));
        assert_eq!(envelope.headers.get("device_id"), Some("d1"));
    }

    #[test]
    fn test_map_outgoing_end_to_end() {
        let function = MappingFunction::from_javascript(
            "function mapToExternal(topic, path, value, headers, status) {\
               return { headers: headers, textPayload: value + 'appendix', contentType: 'text/plain' };\
             }",
        )
        .unwrap();

        let envelope = ProtocolMessage::new("d1/messages", "/outbox")
            .with_value(json!("hello"));
        let message = function.map_outgoing(&envelope).unwrap();

        assert_eq!(message.payload().as_text(), Some("helloappendix"));
        assert_eq!(message.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_ill_shaped_result_is_invalid() {
        let function = MappingFunction::from_javascript(
            "function mapFromExternal() { return { path: '/' }; }",
        )
        .unwrap();

        let message = external("x");
        let result = function.map_incoming(&message);
        assert!(matches!(result, Err(Error::InvalidResult(_))));
    }
}
