//! Base URL resolution and query string serialization.
//!
//! # Examples
//!
//! ```
//! use xhr_pipeline::protocol::{build_query, resolve_url, ParamValue, Params};
//!
//! assert_eq!(resolve_url(Some("http://h/api/"), "/users"), "http://h/api/users");
//! assert_eq!(resolve_url(Some("http://h"), "https://other/x"), "https://other/x");
//!
//! let params = Params::new()
//!     .with("a", vec![1, 2])
//!     .with("b", ParamValue::Null)
//!     .with("c", "x");
//! assert_eq!(build_query("/x", &params), "/x?a%5B%5D=1&a%5B%5D=2&c=x");
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use ::url::form_urlencoded;

static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z][a-z\d+\-.]*:)?//").expect("valid regex"));

static PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-+\w]{1,25})(?::?//|:)").expect("valid regex"));

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Skipped during serialization.
    Null,
    /// A JSON value. Strings, numbers and booleans are written as-is,
    /// objects are JSON-encoded.
    Value(Value),
    /// Written as an ISO-8601 timestamp.
    Date(DateTime<Utc>),
    /// Fans out into repeated `key[]=value` pairs.
    List(Vec<ParamValue>),
}

impl ParamValue {
    fn to_json(&self) -> Value {
        match self {
            ParamValue::Null => Value::Null,
            ParamValue::Value(v) => v.clone(),
            ParamValue::Date(d) => Value::String(iso_timestamp(d)),
            ParamValue::List(items) => Value::Array(items.iter().map(ParamValue::to_json).collect()),
        }
    }

    /// String form of a non-list value, before percent-encoding.
    fn to_query_string(&self) -> Option<String> {
        match self {
            ParamValue::Null | ParamValue::Value(Value::Null) => None,
            ParamValue::Value(Value::String(s)) => Some(s.clone()),
            ParamValue::Value(Value::Number(n)) => Some(n.to_string()),
            ParamValue::Value(Value::Bool(b)) => Some(b.to_string()),
            ParamValue::Date(d) => Some(iso_timestamp(d)),
            other => Some(other.to_json().to_string()),
        }
    }
}

fn iso_timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<Value> for ParamValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => ParamValue::Null,
            Value::Array(items) => ParamValue::List(items.into_iter().map(ParamValue::from).collect()),
            other => ParamValue::Value(other),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Value(Value::String(v.to_string()))
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Value(Value::String(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Value(Value::Bool(v))
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Value(Value::from(v))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Value(Value::from(v))
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Value(Value::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Value(Value::from(v))
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(v: DateTime<Utc>) -> Self {
        ParamValue::Date(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Ordered query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pairs: Vec<(String, ParamValue)>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Params::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing an existing value in place so the original
    /// position is kept.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Value stored for `key`.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate over pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<serde_json::Map<String, Value>> for Params {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Whether `url` is absolute (`scheme://...` or protocol-relative `//...`).
pub fn is_absolute_url(url: &str) -> bool {
    ABSOLUTE_URL.is_match(url)
}

/// Combine `base` and `path` with exactly one `/` between them. Absolute
/// paths and a missing or empty base return `path` unchanged.
pub fn resolve_url(base: Option<&str>, path: &str) -> String {
    match base {
        Some(base) if !base.is_empty() && !is_absolute_url(path) => {
            if path.is_empty() {
                base.to_string()
            } else {
                format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
            }
        }
        _ => path.to_string(),
    }
}

/// Scheme of `url`, lower-cased, when it has one.
pub fn parse_protocol(url: &str) -> Option<String> {
    PROTOCOL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Percent-encode a key: space becomes `+`, reserved characters are escaped.
/// `~ ! ' ( )` stay literal, as `*` already does.
fn encode_key(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace("%7E", "~")
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
}

/// Percent-encode a value like [`encode_key`], then restore `: $ , [ ]`.
fn encode_value(raw: &str) -> String {
    encode_key(raw)
        .replace("%3A", ":")
        .replace("%24", "$")
        .replace("%2C", ",")
        .replace("%5B", "[")
        .replace("%5D", "]")
}

/// Serialize `params` into a query string without the leading `?`.
pub fn serialize_params(params: &Params) -> String {
    let mut parts = Vec::new();

    for (key, value) in params.iter() {
        match value {
            ParamValue::List(items) => {
                let key = encode_key(&format!("{key}[]"));
                for item in items {
                    if let Some(v) = item.to_query_string() {
                        parts.push(format!("{key}={}", encode_value(&v)));
                    }
                }
            }
            other => {
                if let Some(v) = other.to_query_string() {
                    parts.push(format!("{}={}", encode_key(key), encode_value(&v)));
                }
            }
        }
    }

    parts.join("&")
}

/// Append `params` to `url`. Uses `?` when the URL has no query yet and `&`
/// otherwise; a fragment is dropped when parameters are appended.
pub fn build_query(url: &str, params: &Params) -> String {
    let serialized = serialize_params(params);
    if serialized.is_empty() {
        return url.to_string();
    }

    let base = url.split('#').next().unwrap_or(url);
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{serialized}")
}
