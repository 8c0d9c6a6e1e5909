//! HTTP client pipeline.
//!
//! This module turns a [`RequestConfig`](crate::RequestConfig) into a
//! [`Response`](crate::Response) by running it through ordered stages:
//!
//! - **Defaults** from [`ClientConfig`] are merged into every request
//! - **Request interceptors** may rewrite the config or reject it
//! - **Preparation** normalizes headers and serializes the payload
//! - **Transport adapter** drives one transport call to a single outcome
//! - **Response interceptors** may rewrite the response or recover errors
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch       - HttpClient and verb shortcuts
//! ├── adapter     - Transport event state machine
//! ├── interceptor - Interceptor trait and chains
//! ├── stages      - Built-in request and response stages
//! ├── endpoints   - Named endpoint bindings
//! └── config      - Client configuration
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HttpClient`] | Entry point for issuing requests |
//! | [`InterceptorChain`] | Ordered, ejectable interceptor list |
//! | [`TransportAdapter`] | Event-driven transport to future |
//! | [`Endpoints`] | Endpoint table bound to a client |
//! | [`ClientConfig`] | Client-wide defaults |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use xhr_pipeline::client::{ClientConfig, HttpClient};
//!
//! // Default configuration
//! let client = HttpClient::new();
//!
//! // Custom configuration
//! let config = ClientConfig {
//!     base_url: Some("http://localhost:3000/api".to_string()),
//!     request_timeout_ms: 2000,
//!     ..Default::default()
//! };
//! let client = HttpClient::with_config(config);
//! ```
//!
//! ## Rewriting Responses
//!
//! ```
//! use xhr_pipeline::client::HttpClient;
//!
//! let client = HttpClient::new();
//! let handle = client.interceptors().response.use_fn(|mut response| async move {
//!     response.headers.insert("x-seen", "1");
//!     Ok(response)
//! });
//! client.interceptors().response.eject(handle);
//! ```

mod adapter;
mod config;
mod endpoints;
mod fetch;
mod interceptor;
mod stages;

pub use adapter::TransportAdapter;
pub use config::ClientConfig;
pub use endpoints::{expand_template, Endpoint, EndpointFn, Endpoints};
pub use fetch::HttpClient;
pub use interceptor::{Interceptor, InterceptorChain, InterceptorHandle, Interceptors};
pub use stages::{prepare_request, ParseJsonBody};
