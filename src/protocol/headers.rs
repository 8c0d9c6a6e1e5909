//! Header map, header-name normalization and raw header parsing.
//!
//! Header names are stored with the casing the caller used. Lookups are
//! case-insensitive, and [`Headers::normalize_name`] reconciles whatever
//! casing the caller chose onto the canonical one before defaults are
//! applied.
//!
//! # Examples
//!
//! ```
//! use xhr_pipeline::protocol::{parse_headers, Headers};
//!
//! let mut headers = Headers::new();
//! headers.insert("accept", "x");
//! headers.normalize_name("Accept");
//! assert_eq!(headers.get_str("Accept"), Some("x"));
//!
//! let parsed = parse_headers("Content-Length: 5\r\nX-Trace: a\r\nX-Trace: b\r\n");
//! assert_eq!(parsed.get_str("content-length"), Some("5"));
//! assert_eq!(parsed.get_str("x-trace"), Some("a, b"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::constants::{IGNORE_DUPLICATES, SET_COOKIE};

/// A header value: a single string, or a list sent as repeated headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// One value.
    Single(String),
    /// Several values, each assigned separately.
    Multi(Vec<String>),
}

impl HeaderValue {
    /// All values, in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Single(v) => vec![v.as_str()],
            HeaderValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// The single value, or the first one of a list.
    pub fn first(&self) -> Option<&str> {
        match self {
            HeaderValue::Single(v) => Some(v.as_str()),
            HeaderValue::Multi(vs) => vs.first().map(String::as_str),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Single(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Single(v)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(vs: Vec<String>) -> Self {
        HeaderValue::Multi(vs)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(vs: Vec<&str>) -> Self {
        HeaderValue::Multi(vs.into_iter().map(str::to_string).collect())
    }
}

/// Header map with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    entries: BTreeMap<String, HeaderValue>,
}

impl Headers {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header under exactly `name`, returning the previous value
    /// stored under that exact key.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Option<HeaderValue> {
        self.entries.insert(name.into(), value.into())
    }

    /// Stored key matching `name` case-insensitively.
    pub fn find_key(&self, name: &str) -> Option<&str> {
        self.entries
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Value for `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        if let Some(v) = self.entries.get(name) {
            return Some(v);
        }
        self.find_key(name).and_then(|k| self.entries.get(k))
    }

    /// First value for `name`, matched case-insensitively.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HeaderValue::first)
    }

    /// Whether any key matches `name` case-insensitively.
    pub fn contains(&self, name: &str) -> bool {
        self.find_key(name).is_some()
    }

    /// Remove every key matching `name` case-insensitively, returning the
    /// last value removed.
    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .collect();
        let mut removed = None;
        for key in keys {
            removed = self.entries.remove(&key);
        }
        removed
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rename any case-insensitive match of `canonical` to `canonical`,
    /// keeping the value. Does nothing when no key matches.
    pub fn normalize_name(&mut self, canonical: &str) {
        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.as_str() != canonical && k.eq_ignore_ascii_case(canonical))
            .cloned()
            .collect();
        for key in stale {
            if let Some(value) = self.entries.remove(&key) {
                self.entries.insert(canonical.to_string(), value);
            }
        }
    }

    /// Set `key` only when no header with that name is present. Returns
    /// whether the value was set.
    pub fn set_if_unset(&mut self, key: &str, value: impl Into<HeaderValue>) -> bool {
        if self.contains(key) {
            return false;
        }
        self.entries.insert(key.to_string(), value.into());
        true
    }

    /// Overlay `other` on top of this map. A header in `other` replaces any
    /// existing header with the same name regardless of casing.
    pub fn extend_from(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.remove(name);
            self.entries.insert(name.to_string(), value.clone());
        }
    }

    /// The `Content-Type` value, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.get_str(super::constants::CONTENT_TYPE)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Headers
where
    K: Into<String>,
    V: Into<HeaderValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        let mut headers = Headers::new();
        for (k, v) in pairs {
            headers.insert(k, v);
        }
        headers
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a String, &'a HeaderValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, HeaderValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Parse a newline-delimited raw header block into a [`Headers`] map.
///
/// Keys are lower-cased and both sides trimmed. For names where a repeat is
/// meaningless (see [`IGNORE_DUPLICATES`]) only the first value is kept,
/// `set-cookie` accumulates into a list, and any other repeated header is
/// joined with `", "` in the order encountered.
pub fn parse_headers(raw: &str) -> Headers {
    let mut headers = Headers::new();

    for line in raw.split('\n') {
        let Some(colon) = line.find(':') else {
            continue;
        };
        let key = line[..colon].trim().to_ascii_lowercase();
        let value = line[colon + 1..].trim().to_string();
        if key.is_empty() {
            continue;
        }

        let existing = headers.entries.get_mut(&key);
        match existing {
            None => {
                let value = if key == SET_COOKIE {
                    HeaderValue::Multi(vec![value])
                } else {
                    HeaderValue::Single(value)
                };
                headers.entries.insert(key, value);
            }
            Some(_) if IGNORE_DUPLICATES.contains(&key.as_str()) => {}
            Some(HeaderValue::Multi(values)) => values.push(value),
            Some(HeaderValue::Single(joined)) => {
                joined.push_str(", ");
                joined.push_str(&value);
            }
        }
    }

    headers
}
