//! Adapter from the event-driven [`Transport`] contract to one future.
//!
//! # State Machine
//!
//! ```text
//! Building ──send()──▶ Sent ──first completion event──▶ Settled
//!    │
//!    └── unsupported scheme: rejected before a transport exists
//! ```
//!
//! While `Building`, the full URL is resolved and checked, the transport is
//! opened and configured, and the request headers are assigned. `Sent`
//! waits for events; the first one that completes the request settles it
//! and every later event is dropped.
//!
//! # Completion Strategies
//!
//! - [`CompletionMode::LoadEnd`]: the single load-end event completes the
//!   request whatever the status
//! - [`CompletionMode::ReadyState`]: only [`ReadyState::Done`] completes it,
//!   and a status of `0` is treated as "not finished" except for `file:` URLs
//!
//! Error, timeout and abort events reject in both modes. Every outcome is
//! delivered one scheduler tick after the event that caused it.

use http::Method;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{HttpError, Result};
use crate::protocol::constants::{CONTENT_TYPE, SUPPORTED_PROTOCOLS};
use crate::protocol::{build_query, parse_headers, parse_protocol, resolve_url};
use crate::transport::{CompletionMode, EventSink, ReadyState, Transport, TransportEvent, TransportFactory};
use crate::types::{RawResponse, RequestConfig, Response, ResponseData, ResponseType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Building,
    Sent,
    Settled,
}

enum Step {
    Wait,
    Complete,
    Fail(HttpError),
}

/// Runs one [`RequestConfig`] through a fresh transport.
#[derive(Clone)]
pub struct TransportAdapter {
    factory: Arc<dyn TransportFactory>,
}

impl TransportAdapter {
    /// Adapter creating transports with `factory`.
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self { factory }
    }

    /// Send `config` and wait for the transport to settle.
    ///
    /// `config.data` is expected to be transformed already; it is sent as is.
    pub async fn send(&self, config: RequestConfig) -> Result<Response> {
        let mut phase = Phase::Building;

        let full_url = build_query(&resolve_url(config.base_url.as_deref(), &config.url), &config.params);
        let protocol = parse_protocol(&full_url);
        if let Some(scheme) = &protocol {
            if !SUPPORTED_PROTOCOLS.contains(&scheme.as_str()) {
                tracing::warn!(url = %full_url, "rejecting unsupported protocol {}", scheme);
                return Err(HttpError::Protocol { scheme: scheme.clone() });
            }
        }

        let method_name = config.normalized_method();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|_| HttpError::InvalidMethod(method_name.clone()))?;
        let body = config.data.clone().into_body()?;
        let response_type = config.response_type.unwrap_or_default();

        let mut transport = self.factory.create();
        let mode = transport.completion_mode();
        tracing::debug!(?phase, %method, url = %full_url, ?mode, "opening transport");
        transport.open(&method, &full_url)?;

        if let Some(timeout) = config.timeout.filter(|t| !t.is_zero()) {
            transport.set_timeout(timeout);
        }

        for (name, value) in config.headers.iter() {
            if body.is_none() && name.eq_ignore_ascii_case(CONTENT_TYPE) {
                tracing::trace!("dropping {} for a request without body", name);
                continue;
            }
            for v in value.values() {
                transport.set_request_header(name, v)?;
            }
        }

        if response_type.is_native() {
            transport.set_response_type(response_type);
        }

        let (sink, mut events) = EventSink::channel();
        transport.send(body, sink)?;
        phase = Phase::Sent;
        tracing::trace!(?phase, "request sent");

        let is_file = protocol.as_deref() == Some("file");
        let outcome = loop {
            let Some(event) = events.recv().await else {
                break Err(HttpError::Network(
                    "transport closed without reporting completion".to_string(),
                ));
            };

            match classify(event, mode, transport.status(), is_file, config.timeout) {
                Step::Wait => continue,
                Step::Complete => {
                    tokio::task::yield_now().await;
                    break Ok(read_response(transport.as_ref(), response_type, &full_url));
                }
                Step::Fail(error) => {
                    tracing::warn!(url = %full_url, "transport failed: {}", error);
                    tokio::task::yield_now().await;
                    break Err(error);
                }
            }
        };

        events.close();
        phase = Phase::Settled;
        tracing::debug!(?phase, ok = outcome.is_ok(), "transport settled");

        outcome.map(|parts| parts.into_response(config))
    }
}

fn classify(
    event: TransportEvent,
    mode: CompletionMode,
    status: u16,
    is_file: bool,
    timeout: Option<Duration>,
) -> Step {
    match (event, mode) {
        (TransportEvent::LoadEnd, CompletionMode::LoadEnd) => Step::Complete,
        (TransportEvent::ReadyState(ReadyState::Done), CompletionMode::ReadyState) => {
            if status == 0 && !is_file {
                tracing::trace!("ignoring completion with status 0");
                Step::Wait
            } else {
                Step::Complete
            }
        }
        (TransportEvent::Error(message), _) => Step::Fail(HttpError::Network(message)),
        (TransportEvent::Timeout, _) => Step::Fail(HttpError::Timeout {
            timeout_ms: timeout.map_or(0, |t| t.as_millis() as u64),
        }),
        (TransportEvent::Abort, _) => Step::Fail(HttpError::Aborted),
        (event, _) => {
            tracing::trace!(?event, "ignoring event");
            Step::Wait
        }
    }
}

struct ResponseParts {
    data: ResponseData,
    url: String,
    raw: RawResponse,
}

impl ResponseParts {
    fn into_response(self, config: RequestConfig) -> Response {
        Response {
            status: self.raw.status,
            status_text: self.raw.status_text.clone(),
            headers: parse_headers(&self.raw.headers),
            data: self.data,
            config,
            url: Some(self.url),
            raw: Some(self.raw),
        }
    }
}

fn read_response(transport: &dyn Transport, response_type: ResponseType, requested_url: &str) -> ResponseParts {
    let data = if response_type.is_binary() {
        ResponseData::Binary(transport.response())
    } else {
        ResponseData::Text(transport.response_text())
    };

    let raw = RawResponse {
        status: transport.status(),
        status_text: transport.status_text(),
        headers: transport.all_response_headers(),
        body: transport.response(),
        url: transport.response_url(),
    };

    ResponseParts {
        data,
        url: raw.url.clone().unwrap_or_else(|| requested_url.to_string()),
        raw,
    }
}
