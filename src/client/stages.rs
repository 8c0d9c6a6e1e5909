//! Built-in pipeline stages.
//!
//! [`prepare_request`] runs after the request interceptors and turns the
//! config into what the transport adapter expects. [`ParseJsonBody`] is the
//! response interceptor every client installs first.

use async_trait::async_trait;
use std::mem;

use super::interceptor::Interceptor;
use crate::error::{HttpError, Result};
use crate::protocol::constants::{ACCEPT, CONTENT_TYPE, DEFAULT_ACCEPT};
use crate::protocol::transform_request;
use crate::types::{RequestConfig, Response, ResponseData, ResponseType};

/// Normalize header names, default `Accept` and transform the payload into
/// a sendable body.
pub fn prepare_request(mut config: RequestConfig) -> Result<RequestConfig> {
    config.headers.normalize_name(ACCEPT);
    config.headers.normalize_name(CONTENT_TYPE);
    config.headers.set_if_unset(ACCEPT, DEFAULT_ACCEPT);

    let payload = mem::take(&mut config.data);
    config.data = transform_request(payload, &mut config.headers)?;
    Ok(config)
}

/// Parses text bodies as JSON for the `json` and default response types.
///
/// With [`ResponseType::Json`] a body that is not JSON rejects the chain
/// with [`HttpError::Decode`]. With [`ResponseType::Default`] the text is
/// kept as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParseJsonBody;

#[async_trait]
impl Interceptor<Response> for ParseJsonBody {
    async fn on_fulfilled(&self, mut response: Response) -> Result<Response> {
        let response_type = response.config.response_type.unwrap_or_default();
        if !response_type.is_json_flavored() {
            return Ok(response);
        }

        let ResponseData::Text(text) = &response.data else {
            return Ok(response);
        };
        if text.trim().is_empty() {
            return Ok(response);
        }

        match serde_json::from_str(text) {
            Ok(value) => response.data = ResponseData::Json(value),
            Err(e) if response_type == ResponseType::Json => {
                tracing::debug!(status = response.status, "invalid json body: {}", e);
                return Err(HttpError::Decode(e.to_string()));
            }
            Err(_) => {}
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Headers, Payload};
    use serde_json::json;

    fn response(response_type: ResponseType, body: &str) -> Response {
        Response {
            status: 200,
            status_text: "OK".to_string(),
            headers: Headers::new(),
            data: ResponseData::Text(body.to_string()),
            config: RequestConfig::new("/").response_type(response_type),
            url: None,
            raw: None,
        }
    }

    #[test]
    fn test_prepare_defaults_accept_and_content_type() {
        let config = RequestConfig::new("/").method("POST").data(json!({"a": 1}));
        let prepared = prepare_request(config).unwrap();

        assert_eq!(prepared.headers.get_str("Accept"), Some(DEFAULT_ACCEPT));
        assert_eq!(prepared.headers.content_type(), Some("application/json"));
        assert_eq!(prepared.data, Payload::Text(r#"{"a":1}"#.to_string()));
    }

    #[test]
    fn test_prepare_normalizes_header_names() {
        let config = RequestConfig::new("/")
            .header("accept", "text/html")
            .header("content-TYPE", "text/plain");
        let prepared = prepare_request(config).unwrap();

        let names: Vec<&str> = prepared.headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Accept", "Content-Type"]);
        assert_eq!(prepared.headers.get_str("Accept"), Some("text/html"));
    }

    #[tokio::test]
    async fn test_default_type_parses_valid_json() {
        let out = ParseJsonBody.on_fulfilled(response(ResponseType::Default, r#"{"ok":true}"#)).await.unwrap();
        assert_eq!(out.data, ResponseData::Json(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_default_type_keeps_invalid_json_as_text() {
        let out = ParseJsonBody.on_fulfilled(response(ResponseType::Default, "<html>")).await.unwrap();
        assert_eq!(out.data, ResponseData::Text("<html>".to_string()));
    }

    #[tokio::test]
    async fn test_json_type_rejects_invalid_json() {
        let err = ParseJsonBody.on_fulfilled(response(ResponseType::Json, "nope")).await.unwrap_err();
        assert!(matches!(err, HttpError::Decode(_)));
    }

    #[tokio::test]
    async fn test_text_type_and_blank_bodies_untouched() {
        let out = ParseJsonBody.on_fulfilled(response(ResponseType::Text, "[1]")).await.unwrap();
        assert_eq!(out.data, ResponseData::Text("[1]".to_string()));

        let out = ParseJsonBody.on_fulfilled(response(ResponseType::Json, "  ")).await.unwrap();
        assert_eq!(out.data, ResponseData::Text("  ".to_string()));
    }
}
