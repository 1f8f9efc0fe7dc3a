//! Case-insensitive message headers.

use std::collections::{BTreeMap, HashMap};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of the header that carries the payload content type.
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// Case-insensitive string-to-string header map.
///
/// Keys are canonicalized to lowercase on insert and inserting an existing
/// key keeps the last value. Iteration order is deterministic (sorted by
/// canonical key).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap(BTreeMap<String, String>);

impl HeaderMap {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a header, replacing any previous value under the same
    /// case-insensitive key. Returns the replaced value, if any.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.as_ref().to_lowercase(), value.into())
    }

    /// Look up a header by case-insensitive key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Whether a header exists under the given case-insensitive key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(&key.to_lowercase())
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(canonical key, value)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl Extend<(String, String)> for HeaderMap {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl From<HashMap<String, String>> for HeaderMap {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for HeaderMap {
    fn from(entries: [(&str, &str); N]) -> Self {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl Serialize for HeaderMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HeaderMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HeaderMapVisitor;

        impl<'de> Visitor<'de> for HeaderMapVisitor {
            type Value = HeaderMap;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of string headers")
            }

            fn visit_map<A>(self, mut access: A) -> Result<HeaderMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = HeaderMap::new();
                // Entries arrive in document order, so keys that collide
                // after lowercasing resolve last-write-wins.
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(HeaderMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "application/json");

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains_key("Content-type"));
    }

    #[test]
    fn test_last_write_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("device_id", "first");
        let replaced = headers.insert("DEVICE_ID", "second");

        assert_eq!(replaced.as_deref(), Some("first"));
        assert_eq!(headers.get("device_id"), Some("second"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_deserialize_lowercases_keys() {
        let headers: HeaderMap =
            serde_json::from_str(r#"{"Content-Type": "text/plain", "Device_Id": "d1"}"#).unwrap();

        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("device_id"), Some("d1"));

        let json = serde_json::to_value(&headers).unwrap();
        assert_eq!(json["content-type"], "text/plain");
    }

    #[test]
    fn test_from_array() {
        let headers = HeaderMap::from([("A", "1"), ("b", "2")]);
        assert_eq!(headers.get("a"), Some("1"));
        assert_eq!(headers.get("B"), Some("2"));
    }
}
