//! Request and response values flowing through the pipeline.
//!
//! [`RequestConfig`] describes one call. Interceptors receive it by value and
//! return a new one, so nothing the caller owns is ever mutated.
//! [`Response`] is built once per completed transport call and carries the
//! config that produced it.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{HttpError, Result};
use crate::protocol::{HeaderValue, Headers, ParamValue, Params, Payload};

/// How the response body should be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Read as text and parse as JSON. Invalid JSON is an error.
    Json,
    /// Read as text.
    Text,
    /// Read as raw bytes by the transport.
    ArrayBuffer,
    /// Read as raw bytes by the transport.
    Blob,
    /// Read as text by the transport.
    Document,
    /// Read as text; parsed as JSON when it is valid JSON.
    #[default]
    #[serde(rename = "")]
    Default,
}

impl ResponseType {
    /// Whether the transport itself should handle this response type.
    /// JSON and text are always read back as raw text.
    pub fn is_native(self) -> bool {
        !matches!(self, ResponseType::Json | ResponseType::Text | ResponseType::Default)
    }

    /// Whether a text body should be parsed as JSON by the pipeline.
    pub fn is_json_flavored(self) -> bool {
        matches!(self, ResponseType::Json | ResponseType::Default)
    }

    /// Whether the body is read as bytes.
    pub fn is_binary(self) -> bool {
        matches!(self, ResponseType::ArrayBuffer | ResponseType::Blob)
    }
}

/// Configuration for a single request.
///
/// # Examples
///
/// ```
/// use xhr_pipeline::{Payload, RequestConfig};
/// use serde_json::json;
/// use std::time::Duration;
///
/// let config = RequestConfig::new("/users")
///     .method("post")
///     .header("X-Trace", "abc")
///     .data(Payload::Json(json!({"name": "a"})))
///     .timeout(Duration::from_secs(5));
/// assert_eq!(config.method, "post");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    /// Base URL for relative `url`s. Falls back to the client default.
    pub base_url: Option<String>,
    /// Path or absolute URL.
    pub url: String,
    /// HTTP method, any casing. Empty means `GET`.
    pub method: String,
    /// Request headers.
    pub headers: Headers,
    /// Query parameters appended to the URL.
    pub params: Params,
    /// Request body.
    pub data: Payload,
    /// Transport timeout. Falls back to the client default.
    pub timeout: Option<Duration>,
    /// Response body handling. Falls back to the client default.
    pub response_type: Option<ResponseType>,
}

impl RequestConfig {
    /// A `GET` request for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            ..Default::default()
        }
    }

    /// Set the method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Replace the query parameters.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set the body.
    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = data.into();
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// The method upper-cased, `GET` when unset.
    pub fn normalized_method(&self) -> String {
        if self.method.trim().is_empty() {
            "GET".to_string()
        } else {
            self.method.trim().to_ascii_uppercase()
        }
    }
}

/// Response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// Body as text.
    Text(String),
    /// Body parsed as JSON.
    Json(Value),
    /// Body as bytes.
    Binary(Bytes),
}

impl Default for ResponseData {
    fn default() -> Self {
        ResponseData::Text(String::new())
    }
}

/// What the transport reported when the request completed, before any
/// header parsing or body decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    /// Status code as reported.
    pub status: u16,
    /// Status text as reported.
    pub status_text: String,
    /// The unparsed, newline-delimited header block.
    pub headers: String,
    /// Body bytes.
    pub body: Bytes,
    /// Final URL, if the transport reported one.
    pub url: Option<String>,
}

/// A completed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// HTTP status code. `0` for `file:` loads.
    pub status: u16,
    /// Status reason phrase.
    pub status_text: String,
    /// Response headers, keys lower-cased.
    pub headers: Headers,
    /// Response body.
    pub data: ResponseData,
    /// The merged config that produced this response.
    pub config: RequestConfig,
    /// Final URL reported by the transport, after redirects.
    pub url: Option<String>,
    /// Transport state at completion. `None` for responses built by hand.
    pub raw: Option<RawResponse>,
}

impl Response {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as text. Binary bodies are decoded lossily.
    pub fn text(&self) -> String {
        match &self.data {
            ResponseData::Text(t) => t.clone(),
            ResponseData::Json(v) => v.to_string(),
            ResponseData::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.data {
            ResponseData::Json(v) => Ok(T::deserialize(v)?),
            ResponseData::Text(t) => serde_json::from_str(t).map_err(|e| HttpError::Decode(e.to_string())),
            ResponseData::Binary(b) => serde_json::from_slice(b).map_err(|e| HttpError::Decode(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalized_method() {
        assert_eq!(RequestConfig::new("/").normalized_method(), "GET");
        assert_eq!(RequestConfig::new("/").method("patch").normalized_method(), "PATCH");
        assert_eq!(RequestConfig::default().normalized_method(), "GET");
    }

    #[test]
    fn test_response_type_serde() {
        let rt: ResponseType = serde_json::from_str("\"arraybuffer\"").unwrap();
        assert_eq!(rt, ResponseType::ArrayBuffer);
        let rt: ResponseType = serde_json::from_str("\"\"").unwrap();
        assert_eq!(rt, ResponseType::Default);
        assert!(!ResponseType::Json.is_native());
        assert!(ResponseType::Blob.is_native());
    }

    #[test]
    fn test_response_json_helper() {
        let response = Response {
            status: 200,
            status_text: "OK".into(),
            headers: Headers::new(),
            data: ResponseData::Text(r#"{"ok":true}"#.into()),
            config: RequestConfig::new("/"),
            url: None,
            raw: None,
        };
        assert!(response.is_success());
        let value: Value = response.json().unwrap();
        assert_eq!(value, json!({"ok": true}));
    }
}
