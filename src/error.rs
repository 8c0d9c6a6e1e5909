//! Error types for the request pipeline.
//!
//! Every stage of the pipeline reports failure through [`HttpError`]. A
//! rejected request is simply an `Err(HttpError)` flowing through the
//! response interceptor chain, where a stage may recover it into a
//! [`Response`](crate::Response) or pass it on.
//!
//! Nothing in this crate retries. Callers that want retries can classify
//! errors with [`HttpError::is_timeout`] and [`HttpError::is_network`] and
//! re-issue the request from a response interceptor.

use thiserror::Error;

/// Errors produced by the client, the transport adapter and interceptors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The resolved URL carries a scheme the transport cannot handle.
    #[error("unsupported protocol {scheme}:")]
    Protocol {
        /// Scheme found in the resolved URL, without the trailing colon.
        scheme: String,
    },

    /// The transport reported a network level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The configured timeout elapsed before the transport completed.
    #[error("timeout of {timeout_ms}ms exceeded")]
    Timeout {
        /// Timeout that was configured for the request, in milliseconds.
        timeout_ms: u64,
    },

    /// The transport call was aborted.
    #[error("request aborted")]
    Aborted,

    /// An outgoing payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// An interceptor stage rejected the value it was given.
    #[error("interceptor rejected: {0}")]
    Interceptor(String),

    /// A response body declared as JSON could not be parsed.
    #[error("response body is not valid JSON: {0}")]
    Decode(String),

    /// The URL could not be interpreted.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request method is not a valid HTTP token.
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// A header name or value was rejected by the transport.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// An endpoint binding could not be invoked.
    #[error("endpoint error: {0}")]
    Endpoint(String),

    /// JSON encoding or decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HttpError {
    /// Build the error an interceptor returns to reject the chain.
    pub fn interceptor(message: impl Into<String>) -> Self {
        HttpError::Interceptor(message.into())
    }

    /// Whether the error came from a transport timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    /// Whether the error came from a transport network failure or abort.
    pub fn is_network(&self) -> bool {
        matches!(self, HttpError::Network(_) | HttpError::Aborted)
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, HttpError>;
