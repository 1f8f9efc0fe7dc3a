//! Semantic equality for structured messages.
//!
//! Textual serialization order and whitespace are irrelevant under fixture
//! semantics; field values and structure are not. Map-valued fields
//! (headers, JSON objects) compare as key sets, arrays compare element-wise
//! in order, and numbers compare by numeric value regardless of
//! integer/float representation.

use std::fmt;

use mapcheck_protocol::{ExternalMessage, HeaderMap, Payload, ProtocolMessage, StructuredMessage};
use serde_json::Value;

/// Configuration knobs for the comparator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparatorConfig {
    /// Treat a missing field and an explicit JSON null as different.
    /// Off by default; some fixtures intentionally assert explicit null.
    pub distinguish_null_from_absent: bool,

    /// Decode byte payloads as UTF-8 when compared against text payloads.
    /// Off by default; fixtures generally want exact representation
    /// equality.
    pub decode_payloads: bool,
}

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Named field or object key.
    Field(String),
    /// Array index.
    Index(usize),
}

/// Path of the first difference, e.g. `value.attributes.temperature` or
/// `value.items[1]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    fn root() -> Self {
        Self(Vec::new())
    }

    fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(name.to_string()));
        Self(segments)
    }

    fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("message");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// First difference found between two messages.
#[derive(Debug, Clone)]
pub(crate) struct Mismatch {
    pub path: FieldPath,
    pub left: String,
    pub right: String,
}

impl Mismatch {
    fn new(path: FieldPath, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            path,
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Outcome of one comparison. Produced fresh per comparison.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub equal: bool,
    /// Path of the first difference, when unequal.
    pub diff_path: Option<FieldPath>,
    /// Path-qualified description carrying both differing values.
    pub message: String,
}

/// Deep-equality engine for structured messages.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    config: ComparatorConfig,
}

impl Comparator {
    pub fn new(config: ComparatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Compare two messages. The verdict is symmetric in its arguments.
    pub fn compare(&self, left: &StructuredMessage, right: &StructuredMessage) -> ComparisonResult {
        match self.first_mismatch(left, right) {
            None => ComparisonResult {
                equal: true,
                diff_path: None,
                message: "messages are semantically equal".to_string(),
            },
            Some(mismatch) => ComparisonResult {
                message: format!(
                    "mismatch at {}: {} != {}",
                    mismatch.path, mismatch.left, mismatch.right
                ),
                diff_path: Some(mismatch.path),
                equal: false,
            },
        }
    }

    /// Walk both messages, short-circuiting on the first difference.
    pub(crate) fn first_mismatch(
        &self,
        left: &StructuredMessage,
        right: &StructuredMessage,
    ) -> Option<Mismatch> {
        match (left, right) {
            (StructuredMessage::External(l), StructuredMessage::External(r)) => {
                self.compare_external(l, r)
            }
            (StructuredMessage::Protocol(l), StructuredMessage::Protocol(r)) => {
                self.compare_protocol(l, r)
            }
            _ => Some(Mismatch::new(
                FieldPath::root(),
                format!("{} message", left.kind()),
                format!("{} message", right.kind()),
            )),
        }
    }

    fn compare_external(&self, left: &ExternalMessage, right: &ExternalMessage) -> Option<Mismatch> {
        compare_headers(
            &FieldPath::root().child("headers"),
            left.headers(),
            right.headers(),
        )
        .or_else(|| self.compare_payload(left.payload(), right.payload()))
        .or_else(|| {
            compare_optional_str(
                &FieldPath::root().child("contentType"),
                left.content_type(),
                right.content_type(),
            )
        })
    }

    fn compare_payload(&self, left: &Payload, right: &Payload) -> Option<Mismatch> {
        let path = FieldPath::root();
        match (left, right) {
            (Payload::Text(l), Payload::Text(r)) => (l != r).then(|| {
                Mismatch::new(path.child("textPayload"), render_str(l), render_str(r))
            }),
            (Payload::Bytes(l), Payload::Bytes(r)) => (l != r).then(|| {
                Mismatch::new(
                    path.child("bytePayload"),
                    format!("0x{}", hex::encode(l)),
                    format!("0x{}", hex::encode(r)),
                )
            }),
            (Payload::Text(text), Payload::Bytes(bytes))
            | (Payload::Bytes(bytes), Payload::Text(text)) => {
                if self.config.decode_payloads {
                    match std::str::from_utf8(bytes) {
                        Ok(decoded) if decoded == text => None,
                        Ok(decoded) => Some(Mismatch::new(
                            path.child("payload"),
                            render_str(text),
                            render_str(decoded),
                        )),
                        Err(_) => Some(Mismatch::new(
                            path.child("payload"),
                            render_str(text),
                            "non-UTF-8 byte payload".to_string(),
                        )),
                    }
                } else {
                    // Representation equality: a textual payload never
                    // equals a binary one, whatever it decodes to.
                    Some(Mismatch::new(
                        path.child("payload"),
                        describe_payload(left),
                        describe_payload(right),
                    ))
                }
            }
        }
    }

    fn compare_protocol(&self, left: &ProtocolMessage, right: &ProtocolMessage) -> Option<Mismatch> {
        let root = FieldPath::root();
        if left.topic != right.topic {
            return Some(Mismatch::new(
                root.child("topic"),
                render_str(&left.topic),
                render_str(&right.topic),
            ));
        }
        if left.path != right.path {
            return Some(Mismatch::new(
                root.child("path"),
                render_str(&left.path),
                render_str(&right.path),
            ));
        }
        self.compare_optional_value(&root.child("value"), &left.value, &right.value)
            .or_else(|| compare_headers(&root.child("headers"), &left.headers, &right.headers))
            .or_else(|| compare_status(&root.child("status"), left.status, right.status))
    }

    /// An absent envelope value and an explicit JSON null are subject to
    /// the same configuration flag as object fields.
    fn compare_optional_value(
        &self,
        path: &FieldPath,
        left: &Option<Value>,
        right: &Option<Value>,
    ) -> Option<Mismatch> {
        match (left, right) {
            (None, None) => None,
            (Some(l), Some(r)) => self.compare_value(path, l, r),
            (Some(present), None) | (None, Some(present)) => {
                if !self.config.distinguish_null_from_absent && present.is_null() {
                    return None;
                }
                let rendered = render_value(present);
                let (l, r) = if left.is_some() {
                    (rendered, ABSENT.to_string())
                } else {
                    (ABSENT.to_string(), rendered)
                };
                Some(Mismatch::new(path.clone(), l, r))
            }
        }
    }

    fn compare_value(&self, path: &FieldPath, left: &Value, right: &Value) -> Option<Mismatch> {
        match (left, right) {
            (Value::Null, Value::Null) => None,
            (Value::Bool(l), Value::Bool(r)) => {
                (l != r).then(|| Mismatch::new(path.clone(), l.to_string(), r.to_string()))
            }
            (Value::Number(l), Value::Number(r)) => (!numbers_equal(l, r))
                .then(|| Mismatch::new(path.clone(), l.to_string(), r.to_string())),
            (Value::String(l), Value::String(r)) => {
                (l != r).then(|| Mismatch::new(path.clone(), render_str(l), render_str(r)))
            }
            (Value::Array(l), Value::Array(r)) => self.compare_arrays(path, l, r),
            (Value::Object(l), Value::Object(r)) => self.compare_objects(path, l, r),
            _ => Some(Mismatch::new(
                path.clone(),
                render_value(left),
                render_value(right),
            )),
        }
    }

    /// Arrays are ordered data, not sets.
    fn compare_arrays(&self, path: &FieldPath, left: &[Value], right: &[Value]) -> Option<Mismatch> {
        if left.len() != right.len() {
            return Some(Mismatch::new(
                path.clone(),
                format!("array of {} elements", left.len()),
                format!("array of {} elements", right.len()),
            ));
        }
        left.iter()
            .zip(right)
            .enumerate()
            .find_map(|(i, (l, r))| self.compare_value(&path.index(i), l, r))
    }

    /// Objects compare as sets of key/value pairs: order-independent, but
    /// every key on one side must be present with an equal value on the
    /// other.
    fn compare_objects(
        &self,
        path: &FieldPath,
        left: &serde_json::Map<String, Value>,
        right: &serde_json::Map<String, Value>,
    ) -> Option<Mismatch> {
        for (key, left_value) in left {
            let child = path.child(key);
            match right.get(key) {
                Some(right_value) => {
                    if let Some(mismatch) = self.compare_value(&child, left_value, right_value) {
                        return Some(mismatch);
                    }
                }
                None => {
                    if self.config.distinguish_null_from_absent || !left_value.is_null() {
                        return Some(Mismatch::new(
                            child,
                            render_value(left_value),
                            ABSENT.to_string(),
                        ));
                    }
                }
            }
        }
        for (key, right_value) in right {
            if left.contains_key(key) {
                continue;
            }
            if self.config.distinguish_null_from_absent || !right_value.is_null() {
                return Some(Mismatch::new(
                    path.child(key),
                    ABSENT.to_string(),
                    render_value(right_value),
                ));
            }
        }
        None
    }
}

const ABSENT: &str = "<absent>";

fn compare_headers(path: &FieldPath, left: &HeaderMap, right: &HeaderMap) -> Option<Mismatch> {
    for (key, left_value) in left.iter() {
        match right.get(key) {
            Some(right_value) if right_value == left_value => {}
            Some(right_value) => {
                return Some(Mismatch::new(
                    path.child(key),
                    render_str(left_value),
                    render_str(right_value),
                ));
            }
            None => {
                return Some(Mismatch::new(
                    path.child(key),
                    render_str(left_value),
                    ABSENT.to_string(),
                ));
            }
        }
    }
    for (key, right_value) in right.iter() {
        if left.get(key).is_none() {
            return Some(Mismatch::new(
                path.child(key),
                ABSENT.to_string(),
                render_str(right_value),
            ));
        }
    }
    None
}

fn compare_optional_str(
    path: &FieldPath,
    left: Option<&str>,
    right: Option<&str>,
) -> Option<Mismatch> {
    if left == right {
        return None;
    }
    let render = |v: Option<&str>| v.map(render_str).unwrap_or_else(|| ABSENT.to_string());
    Some(Mismatch::new(path.clone(), render(left), render(right)))
}

fn compare_status(path: &FieldPath, left: Option<i64>, right: Option<i64>) -> Option<Mismatch> {
    if left == right {
        return None;
    }
    let render = |v: Option<i64>| v.map(|s| s.to_string()).unwrap_or_else(|| ABSENT.to_string());
    Some(Mismatch::new(path.clone(), render(left), render(right)))
}

/// Numeric equality regardless of integer/floating representation.
fn numbers_equal(left: &serde_json::Number, right: &serde_json::Number) -> bool {
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (left.as_u64(), right.as_u64()) {
        return l == r;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

fn render_str(value: &str) -> String {
    format!("\"{value}\"")
}

fn render_value(value: &Value) -> String {
    value.to_string()
}

fn describe_payload(payload: &Payload) -> String {
    match payload {
        Payload::Text(_) => "text payload".to_string(),
        Payload::Bytes(_) => "byte payload".to_string(),
    }
}
