//! Outgoing payload model and request body transformation.
//!
//! The shape of a request body is carried explicitly by [`Payload`], so
//! choosing a serialization strategy is a `match` instead of probing the
//! value at runtime. [`transform_request`] turns any payload into a sendable
//! one ([`Payload::Empty`], [`Payload::Raw`] or [`Payload::Text`]) and settles
//! the `Content-Type` header on the way.
//!
//! # Decision Order
//!
//! 1. `Empty`, an empty `Text`, or `Raw` bytes pass through untouched, and
//!    a JSON `null` becomes `Empty`
//! 2. `Binary` views are unwrapped to their bytes
//! 3. `Form` pairs are URL-encoded
//! 4. `Json` values, or `Text` sent with a JSON content type, are safely
//!    stringified
//! 5. any other `Text` passes through
//!
//! Binary payloads are matched before JSON, so a binary body is never
//! JSON-encoded whatever its headers say.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{error::Category, Value};
use std::ops::Range;
use ::url::form_urlencoded;

use super::constants::{APPLICATION_JSON, CONTENT_TYPE, FORM_URLENCODED};
use super::headers::Headers;
use crate::error::{HttpError, Result};

/// A window onto a shared byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryView {
    /// Backing buffer.
    pub buffer: Bytes,
    /// Byte range of `buffer` covered by the view.
    pub range: Range<usize>,
}

impl BinaryView {
    /// View over the whole of `buffer`.
    pub fn new(buffer: impl Into<Bytes>) -> Self {
        let buffer = buffer.into();
        let range = 0..buffer.len();
        Self { buffer, range }
    }

    /// View over `range` of `buffer`.
    pub fn with_range(buffer: impl Into<Bytes>, range: Range<usize>) -> Self {
        Self {
            buffer: buffer.into(),
            range,
        }
    }

    /// The viewed bytes. An out-of-bounds range is clamped to the buffer.
    pub fn to_bytes(&self) -> Bytes {
        let end = self.range.end.min(self.buffer.len());
        let start = self.range.start.min(end);
        self.buffer.slice(start..end)
    }
}

/// An outgoing request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No body.
    #[default]
    Empty,
    /// Bytes sent exactly as given (files, blobs, multipart bodies built elsewhere).
    Raw(Bytes),
    /// A view onto a byte buffer.
    Binary(BinaryView),
    /// Key/value pairs sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// A JSON document.
    Json(Value),
    /// Text, possibly already serialized.
    Text(String),
}

impl Payload {
    /// Serialize `value` into a [`Payload::Json`].
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    /// Whether there is no body to send.
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Bytes handed to the transport, or `None` when there is no body.
    ///
    /// Payloads that were not run through [`transform_request`] are encoded
    /// here without touching headers.
    pub fn into_body(self) -> Result<Option<Bytes>> {
        Ok(match self {
            Payload::Empty | Payload::Json(Value::Null) => None,
            Payload::Raw(bytes) => Some(bytes),
            Payload::Binary(view) => Some(view.to_bytes()),
            Payload::Form(pairs) => Some(Bytes::from(encode_form(&pairs))),
            Payload::Json(value) => Some(Bytes::from(stringify_safely(&value)?)),
            Payload::Text(text) if text.is_empty() => None,
            Payload::Text(text) => Some(Bytes::from(text)),
        })
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(Bytes::from(bytes))
    }
}

fn encode_form(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish()
}

fn declares_json(headers: &Headers) -> bool {
    headers
        .content_type()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains(APPLICATION_JSON))
}

/// JSON-encode `value` without double-encoding strings that already hold
/// JSON.
///
/// A string that parses as JSON is returned trimmed. A string that fails
/// to parse because it is not JSON text is encoded as a JSON string; any
/// other parse failure is returned as [`HttpError::Serialization`].
pub fn stringify_safely(value: &Value) -> Result<String> {
    if let Value::String(raw) = value {
        match serde_json::from_str::<Value>(raw) {
            Ok(_) => return Ok(raw.trim().to_string()),
            Err(e) if matches!(e.classify(), Category::Syntax | Category::Eof) => {}
            Err(e) => return Err(HttpError::Serialization(e.to_string())),
        }
    }
    Ok(serde_json::to_string(value)?)
}

/// Convert `payload` into a sendable body, normalizing and defaulting the
/// `Content-Type` header in `headers` as needed.
pub fn transform_request(payload: Payload, headers: &mut Headers) -> Result<Payload> {
    headers.normalize_name(CONTENT_TYPE);

    match payload {
        Payload::Empty | Payload::Raw(_) => Ok(payload),
        Payload::Json(Value::Null) => Ok(Payload::Empty),
        Payload::Text(text) if text.is_empty() => Ok(Payload::Text(text)),
        Payload::Binary(view) => Ok(Payload::Raw(view.to_bytes())),
        Payload::Form(pairs) => {
            headers.set_if_unset(CONTENT_TYPE, FORM_URLENCODED);
            Ok(Payload::Text(encode_form(&pairs)))
        }
        Payload::Json(value) => {
            headers.set_if_unset(CONTENT_TYPE, APPLICATION_JSON);
            Ok(Payload::Text(stringify_safely(&value)?))
        }
        Payload::Text(text) if declares_json(headers) => {
            Ok(Payload::Text(stringify_safely(&Value::String(text))?))
        }
        text @ Payload::Text(_) => Ok(text),
    }
}
