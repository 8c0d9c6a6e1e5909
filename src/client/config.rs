//! Client-wide default configuration.
//!
//! A [`ClientConfig`] is built once and shared behind an `Arc` by every
//! clone of the client. It is never mutated: each call derives a fresh
//! [`RequestConfig`] with [`ClientConfig::merge`].
//!
//! # Examples
//!
//! ```
//! use xhr_pipeline::ClientConfig;
//!
//! let config = ClientConfig {
//!     base_url: Some("http://localhost:3000".to_string()),
//!     request_timeout_ms: 5_000,
//!     ..Default::default()
//! };
//!
//! let loaded = ClientConfig::from_json(r#"{"base_url": "http://localhost:3000", "request_timeout_ms": 5000}"#).unwrap();
//! assert_eq!(loaded, config);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::protocol::Headers;
use crate::types::{RequestConfig, ResponseType};

/// Defaults applied to every request issued by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL for relative request URLs.
    pub base_url: Option<String>,

    /// Headers sent with every request unless the request overrides them.
    pub headers: Headers,

    /// Request timeout in milliseconds. `0` disables the timeout.
    pub request_timeout_ms: u64,

    /// Default response body handling.
    pub response_type: ResponseType,

    /// Proxy for the reqwest transport. Empty for none.
    pub proxy_url: String,

    /// Log every completed request at info level.
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: Headers::new(),
            request_timeout_ms: 0,
            response_type: ResponseType::Default,
            proxy_url: String::new(),
            enable_logging: false,
        }
    }
}

impl ClientConfig {
    /// Load a configuration from a JSON document. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Default timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    /// Derive the effective config for `request`. Values set on the request
    /// win; request headers replace defaults of the same name regardless of
    /// casing. A zero request timeout disables the timeout, like `0` here.
    pub fn merge(&self, request: RequestConfig) -> RequestConfig {
        let mut headers = self.headers.clone();
        headers.extend_from(&request.headers);

        let method = if request.method.trim().is_empty() {
            "GET".to_string()
        } else {
            request.method
        };

        RequestConfig {
            base_url: request.base_url.or_else(|| self.base_url.clone()),
            url: request.url,
            method,
            headers,
            params: request.params,
            data: request.data,
            timeout: match request.timeout {
                Some(timeout) if timeout.is_zero() => None,
                Some(timeout) => Some(timeout),
                None => self.timeout(),
            },
            response_type: Some(request.response_type.unwrap_or(self.response_type)),
        }
    }
}
