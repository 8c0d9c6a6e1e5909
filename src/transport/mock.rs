//! Scripted in-memory transport.
//!
//! [`MockTransportFactory`] hands out transports that replay a
//! [`MockReply`] instead of touching the network, and records every call
//! made on them. It drives the pipeline in tests and in offline setups.
//!
//! # Examples
//!
//! ```
//! use xhr_pipeline::transport::mock::{MockReply, MockTransportFactory};
//! use xhr_pipeline::{ClientConfig, HttpClient};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransportFactory::new(MockReply::json(200, r#"{"ok":true}"#));
//! let client = HttpClient::with_transport(ClientConfig::default(), Arc::new(transport.clone()));
//!
//! let response = client.get("http://h/ping", None, None).await.unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(transport.requests()[0].url.as_deref(), Some("http://h/ping"));
//! # });
//! ```

use bytes::Bytes;
use http::Method;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::{CompletionMode, EventSink, ReadyState, Transport, TransportEvent, TransportFactory};
use crate::error::{HttpError, Result};
use crate::types::ResponseType;

/// What a mock transport reports once sent.
#[derive(Debug, Clone, PartialEq)]
pub struct MockReply {
    /// Completion strategy the transport advertises.
    pub mode: CompletionMode,
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Raw header block.
    pub headers: String,
    /// Body.
    pub body: Bytes,
    /// Final URL, if different from the requested one.
    pub response_url: Option<String>,
    /// Events emitted, in order, when `send` is called.
    pub events: Vec<TransportEvent>,
}

impl Default for MockReply {
    fn default() -> Self {
        MockReply::text(200, "")
    }
}

impl MockReply {
    /// Successful text reply.
    pub fn text(status: u16, body: &str) -> Self {
        MockReply {
            mode: CompletionMode::LoadEnd,
            status,
            status_text: reason(status).to_string(),
            headers: String::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
            response_url: None,
            events: vec![TransportEvent::LoadEnd],
        }
    }

    /// Successful reply with a JSON content type.
    pub fn json(status: u16, body: &str) -> Self {
        MockReply::text(status, body).with_header("Content-Type", "application/json")
    }

    /// Reply that fails with a network error.
    pub fn error(message: &str) -> Self {
        MockReply::text(0, "").with_events(vec![TransportEvent::Error(message.to_string())])
    }

    /// Append a response header line.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push_str(&format!("{name}: {value}\r\n"));
        self
    }

    /// Replace the scripted events.
    pub fn with_events(mut self, events: Vec<TransportEvent>) -> Self {
        self.events = events;
        self
    }

    /// Report completion through ready-state changes instead of load-end.
    pub fn polling(mut self) -> Self {
        self.mode = CompletionMode::ReadyState;
        self.events = vec![
            TransportEvent::ReadyState(ReadyState::HeadersReceived),
            TransportEvent::ReadyState(ReadyState::Loading),
            TransportEvent::ReadyState(ReadyState::Done),
        ];
        self
    }
}

fn reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Everything a mock transport was asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedRequest {
    /// Method passed to `open`.
    pub method: Option<Method>,
    /// URL passed to `open`.
    pub url: Option<String>,
    /// Header assignments, in call order.
    pub headers: Vec<(String, String)>,
    /// Configured timeout.
    pub timeout: Option<Duration>,
    /// Response type set on the transport.
    pub response_type: Option<ResponseType>,
    /// Body passed to `send`.
    pub body: Option<Bytes>,
    /// Whether `send` was called.
    pub sent: bool,
}

impl RecordedRequest {
    /// Values assigned to header `name`, matched case-insensitively.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    fallback: MockReply,
    requests: Vec<RecordedRequest>,
}

/// Factory for scripted transports. Clones share recorded state.
#[derive(Debug, Clone, Default)]
pub struct MockTransportFactory {
    state: Arc<Mutex<MockState>>,
}

impl MockTransportFactory {
    /// Factory answering every request with `reply`.
    pub fn new(reply: MockReply) -> Self {
        let factory = MockTransportFactory::default();
        factory.state.lock().fallback = reply;
        factory
    }

    /// Queue a reply used by the next created transport, ahead of the
    /// default one.
    pub fn push_reply(&self, reply: MockReply) {
        self.state.lock().replies.push_back(reply);
    }

    /// Calls recorded by every transport created so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of transports created.
    pub fn created(&self) -> usize {
        self.state.lock().requests.len()
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        let mut state = self.state.lock();
        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| state.fallback.clone());
        state.requests.push(RecordedRequest::default());
        let index = state.requests.len() - 1;

        Box::new(MockTransport {
            state: Arc::clone(&self.state),
            index,
            reply,
        })
    }
}

struct MockTransport {
    state: Arc<Mutex<MockState>>,
    index: usize,
    reply: MockReply,
}

impl MockTransport {
    fn record(&self, f: impl FnOnce(&mut RecordedRequest)) {
        let mut state = self.state.lock();
        if let Some(request) = state.requests.get_mut(self.index) {
            f(request);
        }
    }
}

impl Transport for MockTransport {
    fn completion_mode(&self) -> CompletionMode {
        self.reply.mode
    }

    fn open(&mut self, method: &Method, url: &str) -> Result<()> {
        self.record(|r| {
            r.method = Some(method.clone());
            r.url = Some(url.to_string());
        });
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() {
            return Err(HttpError::InvalidHeader("empty header name".to_string()));
        }
        self.record(|r| r.headers.push((name.to_string(), value.to_string())));
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.record(|r| r.timeout = Some(timeout));
    }

    fn set_response_type(&mut self, response_type: ResponseType) {
        self.record(|r| r.response_type = Some(response_type));
    }

    fn send(&mut self, body: Option<Bytes>, events: EventSink) -> Result<()> {
        self.record(|r| {
            r.body = body;
            r.sent = true;
        });
        for event in self.reply.events.iter().cloned() {
            events.emit(event);
        }
        Ok(())
    }

    fn status(&self) -> u16 {
        self.reply.status
    }

    fn status_text(&self) -> String {
        self.reply.status_text.clone()
    }

    fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.reply.body).into_owned()
    }

    fn response(&self) -> Bytes {
        self.reply.body.clone()
    }

    fn response_url(&self) -> Option<String> {
        self.reply.response_url.clone()
    }

    fn all_response_headers(&self) -> String {
        self.reply.headers.clone()
    }
}
