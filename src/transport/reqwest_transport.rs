//! [`Transport`] implementation backed by `reqwest`.
//!
//! `send` spawns the request on the current tokio runtime and reports
//! completion through the event sink:
//!
//! - `LoadEnd` once the whole body has been read, whatever the status
//! - `Timeout` when reqwest reports a timeout
//! - `Error` for any other failure
//!
//! `file:` URLs are read from disk and complete with status `0`, the way a
//! browser reports local loads. `blob:` URLs have no meaning outside a
//! browser and fail with an error event.

use bytes::Bytes;
use http::Method;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use super::{CompletionMode, EventSink, Transport, TransportEvent, TransportFactory};
use crate::client::ClientConfig;
use crate::error::{HttpError, Result};
use crate::protocol::parse_protocol;
use crate::types::ResponseType;

/// Creates [`ReqwestTransport`]s sharing one `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransportFactory {
    client: reqwest::Client,
}

impl ReqwestTransportFactory {
    /// Factory with a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Factory using `client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Factory whose client honours the proxy settings in `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = reqwest::Client::builder();

        if !config.proxy_url.is_empty() {
            match reqwest::Proxy::all(&config.proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!("ignoring invalid proxy url {}: {}", config.proxy_url, e),
            }
        }

        Self::with_client(builder.build().unwrap_or_default())
    }
}

impl Default for ReqwestTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportFactory for ReqwestTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        Box::new(ReqwestTransport::new(self.client.clone()))
    }
}

#[derive(Debug, Default)]
struct Completed {
    status: u16,
    status_text: String,
    headers: String,
    body: Bytes,
    url: Option<String>,
}

/// One request over `reqwest`.
#[derive(Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    method: Option<Method>,
    url: Option<String>,
    headers: Vec<(http::HeaderName, http::HeaderValue)>,
    timeout: Option<Duration>,
    response_type: ResponseType,
    completed: Arc<Mutex<Completed>>,
}

impl ReqwestTransport {
    /// Unopened transport using `client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            method: None,
            url: None,
            headers: Vec::new(),
            timeout: None,
            response_type: ResponseType::Default,
            completed: Arc::new(Mutex::new(Completed::default())),
        }
    }

    /// Response type requested by the pipeline. The body is always
    /// buffered as bytes, so this only matters to callers inspecting it.
    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }
}

impl Transport for ReqwestTransport {
    fn completion_mode(&self) -> CompletionMode {
        CompletionMode::LoadEnd
    }

    fn open(&mut self, method: &Method, url: &str) -> Result<()> {
        ::url::Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))?;
        self.method = Some(method.clone());
        self.url = Some(url.to_string());
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = http::HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::InvalidHeader(format!("{name}: {e}")))?;
        let value = http::HeaderValue::from_str(value)
            .map_err(|e| HttpError::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.push((name, value));
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
    }

    fn set_response_type(&mut self, response_type: ResponseType) {
        self.response_type = response_type;
    }

    fn send(&mut self, body: Option<Bytes>, events: EventSink) -> Result<()> {
        let (Some(method), Some(url)) = (self.method.clone(), self.url.clone()) else {
            return Err(HttpError::Network("send called before open".to_string()));
        };
        let runtime = Handle::try_current().map_err(|e| HttpError::Network(e.to_string()))?;
        let completed = Arc::clone(&self.completed);

        match parse_protocol(&url).as_deref() {
            Some("file") => {
                runtime.spawn(load_file(url, completed, events));
            }
            Some("blob") => {
                events.emit(TransportEvent::Error(format!("cannot load {url}: blob URLs are not supported")));
            }
            _ => {
                let mut request = self.client.request(method, url.as_str());
                for (name, value) in self.headers.drain(..) {
                    request = request.header(name, value);
                }
                if let Some(timeout) = self.timeout {
                    request = request.timeout(timeout);
                }
                if let Some(body) = body {
                    request = request.body(body);
                }
                runtime.spawn(fetch(request, completed, events));
            }
        }

        Ok(())
    }

    fn status(&self) -> u16 {
        self.completed.lock().status
    }

    fn status_text(&self) -> String {
        self.completed.lock().status_text.clone()
    }

    fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.completed.lock().body).into_owned()
    }

    fn response(&self) -> Bytes {
        self.completed.lock().body.clone()
    }

    fn response_url(&self) -> Option<String> {
        self.completed.lock().url.clone()
    }

    fn all_response_headers(&self) -> String {
        self.completed.lock().headers.clone()
    }
}

fn report_failure(events: &EventSink, error: reqwest::Error) {
    if error.is_timeout() {
        events.emit(TransportEvent::Timeout);
    } else {
        events.emit(TransportEvent::Error(error.to_string()));
    }
}

async fn fetch(request: reqwest::RequestBuilder, completed: Arc<Mutex<Completed>>, events: EventSink) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return report_failure(&events, e),
    };

    let status = response.status();
    let url = response.url().to_string();
    let mut headers = String::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers.push_str(name.as_str());
            headers.push_str(": ");
            headers.push_str(value);
            headers.push_str("\r\n");
        }
    }

    match response.bytes().await {
        Ok(body) => {
            *completed.lock() = Completed {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                headers,
                body,
                url: Some(url),
            };
            events.emit(TransportEvent::LoadEnd);
        }
        Err(e) => report_failure(&events, e),
    }
}

async fn load_file(url: String, completed: Arc<Mutex<Completed>>, events: EventSink) {
    let path = match ::url::Url::parse(&url).ok().and_then(|u| u.to_file_path().ok()) {
        Some(path) => path,
        None => {
            events.emit(TransportEvent::Error(format!("invalid file url {url}")));
            return;
        }
    };

    match tokio::fs::read(&path).await {
        Ok(body) => {
            *completed.lock() = Completed {
                status: 0,
                status_text: String::new(),
                headers: String::new(),
                body: Bytes::from(body),
                url: Some(url),
            };
            events.emit(TransportEvent::LoadEnd);
        }
        Err(e) => {
            events.emit(TransportEvent::Error(format!("{}: {e}", path.display())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_header_name() {
        let mut transport = ReqwestTransport::new(reqwest::Client::new());
        let err = transport.set_request_header("bad header", "x").unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeader(_)));
        assert!(transport.set_request_header("X-Ok", "x").is_ok());
    }

    #[tokio::test]
    async fn test_blob_urls_fail_with_error_event() {
        let mut transport = ReqwestTransport::new(reqwest::Client::new());
        transport.open(&Method::GET, "blob:http://h/abc").unwrap();

        let (sink, mut rx) = EventSink::channel();
        transport.send(None, sink).unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Error(_))));
    }

    #[test]
    fn test_relative_url_cannot_be_opened() {
        let mut transport = ReqwestTransport::new(reqwest::Client::new());
        let err = transport.open(&Method::GET, "/no-base").unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }

    #[test]
    fn test_send_before_open_fails() {
        let mut transport = ReqwestTransport::new(reqwest::Client::new());
        let (sink, _rx) = EventSink::channel();
        assert!(transport.send(None, sink).is_err());
    }
}
