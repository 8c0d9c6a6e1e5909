#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # xhr_pipeline: an interceptor-driven HTTP client
//!
//! This crate sends HTTP requests through a fixed pipeline of stages on top
//! of an XHR-style event transport. It does not care how bytes move; a
//! [`Transport`](transport::Transport) only has to be opened, configured,
//! sent, and report completion through events.
//!
//! ## Overview
//!
//! A request passes through five stages:
//!
//! 1. **Merge** - client defaults fill in what the request leaves unset
//! 2. **Request interceptors** - user stages rewrite or reject the config
//! 3. **Prepare** - header names are normalized, `Accept` is defaulted and
//!    the payload is serialized
//! 4. **Transport adapter** - the transport's events settle into one result
//! 5. **Response interceptors** - the body is parsed as JSON, then user
//!    stages rewrite the response or recover errors
//!
//! ## Key Features
//!
//! - **Ejectable interceptors**: handles stay valid after other stages are removed
//! - **Payload transformer**: JSON, forms, text and binary views become bodies
//! - **URL resolver**: base URL joining and nested query serialization
//! - **Header normalizer**: raw response header blocks into a typed map
//! - **Settle-once transport adapter**: late or duplicate events are dropped
//! - **HTTP Status Codes**: every status resolves; only transport failures reject
//!
//! ## Client Usage
//!
//! ```no_run
//! use xhr_pipeline::{ClientConfig, HttpClient, ResponseData};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::with_config(ClientConfig {
//!         base_url: Some("http://localhost:3000".to_string()),
//!         ..Default::default()
//!     });
//!
//!     let response = client.post("/users", json!({"name": "a"}), None).await?;
//!     if let ResponseData::Json(body) = &response.data {
//!         println!("Created: {}", body);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Request config, response and response types
//! - **[error]** - Error types and result handling
//! - **[client]** - Client, interceptors, transport adapter and endpoints
//! - **[transport]** - Transport contract, reqwest and mock implementations
//! - **[protocol]** - URL, header and payload helpers

pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod types;

pub use client::{ClientConfig, HttpClient};
pub use error::{HttpError, Result};
pub use protocol::{BinaryView, HeaderValue, Headers, ParamValue, Params, Payload};
pub use types::{RawResponse, RequestConfig, Response, ResponseData, ResponseType};
