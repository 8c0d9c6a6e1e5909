//! XHR-style transport contract.
//!
//! A [`Transport`] is a one-shot request object: it is opened with a method
//! and URL, configured with headers, a timeout and a response type, and then
//! started with [`Transport::send`]. Completion is reported through the
//! [`EventSink`] handed to `send`, never through the return value. After a
//! completion event the response fields (`status`, `response_text`, ...) are
//! readable.
//!
//! # Events
//!
//! | Event | Meaning |
//! |-------|---------|
//! | [`TransportEvent::LoadEnd`] | Finished, successfully or not |
//! | [`TransportEvent::ReadyState`] | Progress of a polling transport |
//! | [`TransportEvent::Error`] | Network failure |
//! | [`TransportEvent::Timeout`] | Configured timeout elapsed |
//! | [`TransportEvent::Abort`] | Request aborted |
//!
//! The sink fuses on the first terminal event, so a transport that reports
//! both `Error` and `LoadEnd` for one failure only delivers the first.

use bytes::Bytes;
use http::Method;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::ResponseType;

pub mod mock;
pub mod reqwest_transport;

/// Progress states of a polling transport, as in `XMLHttpRequest.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// Not opened yet.
    Unsent = 0,
    /// `open` was called.
    Opened = 1,
    /// Status line and headers are available.
    HeadersReceived = 2,
    /// Body is downloading.
    Loading = 3,
    /// Finished, successfully or not.
    Done = 4,
}

/// How a transport signals that it has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// A single [`TransportEvent::LoadEnd`] fired for success and failure.
    LoadEnd,
    /// [`TransportEvent::ReadyState`] changes, ending with [`ReadyState::Done`].
    ReadyState,
}

/// Event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The request finished.
    LoadEnd,
    /// The ready state changed.
    ReadyState(ReadyState),
    /// Network failure with a description.
    Error(String),
    /// The configured timeout elapsed.
    Timeout,
    /// The request was aborted.
    Abort,
}

impl TransportEvent {
    /// Events after which the transport reports nothing else.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::ReadyState(_))
    }
}

/// Channel through which a transport reports events.
///
/// Cloneable so transports can move it into background tasks. Once a
/// terminal event has been emitted every later emit is dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
    settled: Arc<AtomicBool>,
}

impl EventSink {
    /// Create a sink and the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink {
            tx,
            settled: Arc::new(AtomicBool::new(false)),
        };
        (sink, rx)
    }

    /// Report `event`. Returns `false` when it was dropped because a
    /// terminal event came first or the receiver is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        if self.settled.load(Ordering::Acquire) {
            return false;
        }
        if event.is_terminal() && self.settled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    /// Whether a terminal event has been emitted.
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

/// One-shot XHR-style request object.
pub trait Transport: Send {
    /// How this transport reports completion.
    fn completion_mode(&self) -> CompletionMode;

    /// Prepare a request.
    fn open(&mut self, method: &Method, url: &str) -> Result<()>;

    /// Add a request header. May be called several times for one name.
    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Fail with [`TransportEvent::Timeout`] if not finished within `timeout`.
    /// A zero duration means no timeout.
    fn set_timeout(&mut self, timeout: Duration);

    /// Ask the transport to decode the body natively.
    fn set_response_type(&mut self, response_type: ResponseType);

    /// Start the request. Completion is reported through `events`.
    fn send(&mut self, body: Option<Bytes>, events: EventSink) -> Result<()>;

    /// Status code, `0` before completion.
    fn status(&self) -> u16;

    /// Status reason phrase.
    fn status_text(&self) -> String;

    /// Body decoded as text.
    fn response_text(&self) -> String;

    /// Body as bytes.
    fn response(&self) -> Bytes;

    /// Final URL after redirects.
    fn response_url(&self) -> Option<String>;

    /// All response headers as one newline-delimited block.
    fn all_response_headers(&self) -> String;
}

/// Creates a fresh [`Transport`] for every request.
pub trait TransportFactory: Send + Sync {
    /// New transport instance.
    fn create(&self) -> Box<dyn Transport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_fuses_after_terminal_event() {
        let (sink, mut rx) = EventSink::channel();

        assert!(sink.emit(TransportEvent::ReadyState(ReadyState::Loading)));
        assert!(sink.emit(TransportEvent::Error("reset".into())));
        assert!(!sink.emit(TransportEvent::LoadEnd));
        assert!(!sink.clone().emit(TransportEvent::Timeout));
        assert!(sink.is_settled());
        drop(sink);

        assert_eq!(rx.recv().await, Some(TransportEvent::ReadyState(ReadyState::Loading)));
        assert_eq!(rx.recv().await, Some(TransportEvent::Error("reset".into())));
        assert_eq!(rx.recv().await, None);
    }
}
