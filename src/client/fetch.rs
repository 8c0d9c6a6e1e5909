//! The request pipeline client.
//!
//! Every call goes through the same stages:
//!
//! ```text
//! merge defaults ─▶ request interceptors ─▶ prepare ─▶ transport ─▶ response interceptors
//! ```
//!
//! A failure at any stage becomes an `Err` that skips the remaining request
//! stages and is handed to the response interceptors, which may recover it.
//!
//! # Examples
//!
//! ## Simple GET request
//!
//! ```no_run
//! use xhr_pipeline::HttpClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new();
//!     let response = client.get("http://example.com/api/data", None, None).await?;
//!     println!("Status: {}", response.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Authenticating every request
//!
//! ```no_run
//! use xhr_pipeline::{ClientConfig, HttpClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::with_config(ClientConfig {
//!         base_url: Some("http://example.com/api".to_string()),
//!         ..Default::default()
//!     });
//!
//!     client.interceptors().request.use_fn(|mut config| async move {
//!         config.headers.insert("Authorization", "Bearer token");
//!         Ok(config)
//!     });
//!
//!     let response = client.post("/items", json!({"name": "a"}), None).await?;
//!     println!("Created: {:?}", response.data);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use tracing::Instrument;

use super::adapter::TransportAdapter;
use super::config::ClientConfig;
use super::interceptor::Interceptors;
use super::stages::{prepare_request, ParseJsonBody};
use crate::error::Result;
use crate::protocol::{Params, Payload};
use crate::transport::reqwest_transport::ReqwestTransportFactory;
use crate::transport::TransportFactory;
use crate::types::{RequestConfig, Response};

/// HTTP client running requests through interceptor chains and a
/// pluggable transport.
///
/// Clones share the configuration, the transport factory and the
/// interceptor chains.
#[derive(Clone)]
pub struct HttpClient {
    config: Arc<ClientConfig>,
    adapter: TransportAdapter,
    interceptors: Interceptors,
}

impl HttpClient {
    /// Create a client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client sending requests over `reqwest`
    pub fn with_config(config: ClientConfig) -> Self {
        let factory = ReqwestTransportFactory::from_config(&config);
        Self::with_transport(config, Arc::new(factory))
    }

    /// Create a client using transports from `factory`
    pub fn with_transport(config: ClientConfig, factory: Arc<dyn TransportFactory>) -> Self {
        let interceptors = Interceptors::default();
        interceptors.response.use_interceptor(ParseJsonBody);

        HttpClient {
            config: Arc::new(config),
            adapter: TransportAdapter::new(factory),
            interceptors,
        }
    }

    /// The request and response interceptor chains.
    ///
    /// Slot 0 of the response chain holds the built-in JSON body parser.
    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run `request` through the full pipeline.
    ///
    /// Only transport failures, timeouts, aborts and stage errors reject;
    /// any HTTP status resolves.
    pub async fn request(&self, request: RequestConfig) -> Result<Response> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::debug_span!(
            "http_request",
            %request_id,
            method = %request.normalized_method(),
            url = %request.url,
        );

        self.run(request).instrument(span).await
    }

    async fn run(&self, request: RequestConfig) -> Result<Response> {
        let merged = self.config.merge(request);

        let prepared = self
            .interceptors
            .request
            .apply(Ok(merged))
            .await
            .and_then(prepare_request);

        let outcome = match prepared {
            Ok(config) => self.adapter.send(config).await,
            Err(e) => {
                tracing::debug!("request stages rejected: {}", e);
                Err(e)
            }
        };

        let result = self.interceptors.response.apply(outcome).await;

        if self.config.enable_logging {
            match &result {
                Ok(response) => tracing::info!(status = response.status, "request completed"),
                Err(e) => tracing::warn!("request failed: {}", e),
            }
        }

        result
    }

    /// `GET url` with optional query params.
    pub async fn get(&self, url: &str, params: Option<Params>, options: Option<RequestConfig>) -> Result<Response> {
        self.request(without_body("GET", url, params, options)).await
    }

    /// `DELETE url` with optional query params.
    pub async fn delete(&self, url: &str, params: Option<Params>, options: Option<RequestConfig>) -> Result<Response> {
        self.request(without_body("DELETE", url, params, options)).await
    }

    /// `HEAD url` with optional query params.
    pub async fn head(&self, url: &str, params: Option<Params>, options: Option<RequestConfig>) -> Result<Response> {
        self.request(without_body("HEAD", url, params, options)).await
    }

    /// `OPTIONS url` with optional query params.
    pub async fn options(&self, url: &str, params: Option<Params>, options: Option<RequestConfig>) -> Result<Response> {
        self.request(without_body("OPTIONS", url, params, options)).await
    }

    /// `POST url` with `data` as the body.
    pub async fn post(&self, url: &str, data: impl Into<Payload>, options: Option<RequestConfig>) -> Result<Response> {
        self.request(with_body("POST", url, data.into(), options)).await
    }

    /// `PUT url` with `data` as the body.
    pub async fn put(&self, url: &str, data: impl Into<Payload>, options: Option<RequestConfig>) -> Result<Response> {
        self.request(with_body("PUT", url, data.into(), options)).await
    }

    /// `PATCH url` with `data` as the body.
    pub async fn patch(&self, url: &str, data: impl Into<Payload>, options: Option<RequestConfig>) -> Result<Response> {
        self.request(with_body("PATCH", url, data.into(), options)).await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("request_interceptors", &self.interceptors.request.active())
            .field("response_interceptors", &self.interceptors.response.active())
            .finish_non_exhaustive()
    }
}

fn base(method: &str, url: &str, options: Option<RequestConfig>) -> RequestConfig {
    let mut config = options.unwrap_or_default();
    config.url = url.to_string();
    config.method = method.to_string();
    config
}

fn without_body(method: &str, url: &str, params: Option<Params>, options: Option<RequestConfig>) -> RequestConfig {
    let mut config = base(method, url, options);
    if let Some(params) = params {
        for (key, value) in params.iter() {
            config.params.insert(key, value.clone());
        }
    }
    config
}

fn with_body(method: &str, url: &str, data: Payload, options: Option<RequestConfig>) -> RequestConfig {
    let mut config = base(method, url, options);
    config.data = data;
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::transport::mock::{MockReply, MockTransportFactory};
    use crate::types::ResponseData;
    use serde_json::json;

    fn mock_client(reply: MockReply) -> (HttpClient, MockTransportFactory) {
        let factory = MockTransportFactory::new(reply);
        let config = ClientConfig {
            base_url: Some("http://h".to_string()),
            ..Default::default()
        };
        (HttpClient::with_transport(config, Arc::new(factory.clone())), factory)
    }

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new();
        assert_eq!(client.config().request_timeout_ms, 0);
        assert_eq!(client.interceptors().response.active(), 1);
        assert!(client.interceptors().request.is_empty());
    }

    #[test]
    fn test_verb_helpers_merge_options() {
        let options = RequestConfig::new("ignored").header("X-A", "1").param("page", 1);
        let config = without_body("DELETE", "/r", Some(Params::new().with("id", 3)), Some(options));
        assert_eq!(config.method, "DELETE");
        assert_eq!(config.url, "/r");
        assert_eq!(config.params.len(), 2);
        assert_eq!(config.headers.get_str("x-a"), Some("1"));

        let config = with_body("PUT", "/r", Payload::from("x"), None);
        assert_eq!(config.data, Payload::Text("x".to_string()));
    }

    #[tokio::test]
    async fn test_post_json_round_trip() {
        let (client, factory) = mock_client(MockReply::json(201, r#"{"id":1}"#));
        let response = client.post("/items", json!({"name": "a"}), None).await.unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.data, ResponseData::Json(json!({"id": 1})));

        let sent = &factory.requests()[0];
        assert_eq!(sent.url.as_deref(), Some("http://h/items"));
        assert_eq!(sent.header_values("Content-Type"), vec!["application/json"]);
        assert_eq!(sent.header_values("Accept"), vec!["application/json, text/plain, */*"]);
    }

    #[tokio::test]
    async fn test_request_interceptor_error_reaches_response_chain() {
        let (client, factory) = mock_client(MockReply::default());
        client
            .interceptors()
            .request
            .use_fn(|_| async move { Err(HttpError::interceptor("denied")) });

        let err = client.get("/r", None, None).await.unwrap_err();
        assert!(matches!(err, HttpError::Interceptor(_)));
        assert_eq!(factory.created(), 0);

        client
            .interceptors()
            .response
            .use_fns(|r| async move { Ok(r) }, |_| async move { Ok(Response::default()) });
        let recovered = client.get("/r", None, None).await.unwrap();
        assert_eq!(recovered.status, 0);
    }
}
