use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use xhr_pipeline::transport::mock::{MockReply, MockTransportFactory};
use xhr_pipeline::transport::{ReadyState, TransportEvent};
use xhr_pipeline::{ClientConfig, HttpClient, HttpError, Params, RequestConfig, ResponseData, ResponseType};

fn client_with(config: ClientConfig, reply: MockReply) -> (HttpClient, MockTransportFactory) {
    let factory = MockTransportFactory::new(reply);
    (HttpClient::with_transport(config, Arc::new(factory.clone())), factory)
}

fn mock_client(reply: MockReply) -> (HttpClient, MockTransportFactory) {
    let config = ClientConfig {
        base_url: Some("http://h".to_string()),
        ..Default::default()
    };
    client_with(config, reply)
}

#[tokio::test]
async fn test_post_end_to_end() {
    let (client, transport) = mock_client(MockReply::json(200, r#"{"ok":true}"#));

    let response = client.post("/r", json!({"name": "a"}), None).await.unwrap();
    assert_eq!(response.data, ResponseData::Json(json!({"ok": true})));
    assert_eq!(response.headers.get_str("content-type"), Some("application/json"));
    assert_eq!(response.config.method, "POST");

    let sent = &transport.requests()[0];
    assert_eq!(sent.method, Some(http::Method::POST));
    assert_eq!(sent.url.as_deref(), Some("http://h/r"));
    assert_eq!(sent.header_values("Content-Type"), vec!["application/json"]);
    assert_eq!(sent.header_values("Accept"), vec!["application/json, text/plain, */*"]);
    assert_eq!(sent.body.as_deref(), Some(&br#"{"name":"a"}"#[..]));
    assert!(sent.sent);
}

#[tokio::test]
async fn test_get_with_nested_params() {
    let (client, transport) = mock_client(MockReply::default());
    let params = Params::new().with("a", vec![1, 2]).with("c", "x y").with("skip", None::<i32>);

    client.get("/x?z=0#frag", Some(params), None).await.unwrap();
    assert_eq!(
        transport.requests()[0].url.as_deref(),
        Some("http://h/x?z=0&a%5B%5D=1&a%5B%5D=2&c=x+y")
    );
}

#[tokio::test]
async fn test_unsupported_protocol_rejects_without_transport() {
    let (client, transport) = mock_client(MockReply::default());
    let err = client.get("ftp://x/y", None, None).await.unwrap_err();

    assert!(matches!(err, HttpError::Protocol { ref scheme } if scheme == "ftp"));
    assert_eq!(err.to_string(), "unsupported protocol ftp:");
    assert_eq!(transport.created(), 0);
}

#[tokio::test]
async fn test_settles_once_on_first_event() {
    let (client, _) = mock_client(
        MockReply::text(200, "done").with_events(vec![TransportEvent::LoadEnd, TransportEvent::Error("late".into())]),
    );
    let response = client.get("/r", None, None).await.unwrap();
    assert_eq!(response.data, ResponseData::Text("done".into()));

    let (client, _) = mock_client(
        MockReply::text(200, "done").with_events(vec![TransportEvent::Error("first".into()), TransportEvent::LoadEnd]),
    );
    let err = client.get("/r", None, None).await.unwrap_err();
    assert!(matches!(err, HttpError::Network(ref m) if m == "first"));
}

#[tokio::test]
async fn test_http_error_statuses_resolve() {
    let (client, _) = mock_client(MockReply::json(404, r#"{"error":"missing"}"#));
    let response = client.get("/r", None, None).await.unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
    assert_eq!(response.data, ResponseData::Json(json!({"error": "missing"})));
}

#[tokio::test]
async fn test_polling_transport() {
    let (client, _) = mock_client(MockReply::text(200, "[1,2]").polling());
    let response = client.get("/r", None, None).await.unwrap();
    assert_eq!(response.data, ResponseData::Json(json!([1, 2])));

    let reply = MockReply::text(0, "").polling().with_events(vec![
        TransportEvent::ReadyState(ReadyState::Done),
        TransportEvent::Error("refused".into()),
    ]);
    let (client, _) = mock_client(reply);
    let err = client.get("/r", None, None).await.unwrap_err();
    assert!(err.is_network());

    let (client, _) = client_with(ClientConfig::default(), MockReply::text(0, "local").polling());
    let response = client.get("file:///tmp/x.txt", None, None).await.unwrap();
    assert_eq!(response.status, 0);
    assert_eq!(response.data, ResponseData::Text("local".into()));
}

#[tokio::test]
async fn test_timeout_and_abort() {
    let config = ClientConfig {
        base_url: Some("http://h".to_string()),
        request_timeout_ms: 250,
        ..Default::default()
    };
    let (client, transport) = client_with(config, MockReply::default().with_events(vec![TransportEvent::Timeout]));
    let err = client.get("/slow", None, None).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "timeout of 250ms exceeded");
    assert_eq!(transport.requests()[0].timeout, Some(Duration::from_millis(250)));

    let (client, _) = mock_client(MockReply::default().with_events(vec![TransportEvent::Abort]));
    let err = client.get("/r", None, None).await.unwrap_err();
    assert!(matches!(err, HttpError::Aborted));
}

#[tokio::test]
async fn test_headers_without_body() {
    let (client, transport) = mock_client(MockReply::default());
    let options = RequestConfig::default()
        .header("content-type", "application/json")
        .header("X-Tag", vec!["a", "b"]);
    client.get("/r", None, Some(options)).await.unwrap();

    let sent = &transport.requests()[0];
    assert!(sent.header_values("content-type").is_empty());
    assert_eq!(sent.header_values("x-tag"), vec!["a", "b"]);
}

#[tokio::test]
async fn test_response_types() {
    let (client, transport) = mock_client(MockReply::text(200, "not json"));

    let options = RequestConfig::default().response_type(ResponseType::Json);
    let err = client.get("/r", None, Some(options)).await.unwrap_err();
    assert!(matches!(err, HttpError::Decode(_)));

    let response = client.get("/r", None, None).await.unwrap();
    assert_eq!(response.data, ResponseData::Text("not json".into()));

    let options = RequestConfig::default().response_type(ResponseType::Blob);
    let response = client.get("/r", None, Some(options)).await.unwrap();
    assert!(matches!(response.data, ResponseData::Binary(_)));

    let recorded: Vec<_> = transport.requests().into_iter().map(|r| r.response_type).collect();
    assert_eq!(recorded, vec![None, None, Some(ResponseType::Blob)]);
}

#[tokio::test]
async fn test_interceptors_wrap_the_transport() {
    let (client, transport) = mock_client(MockReply::error("connection refused"));

    let auth = client.interceptors().request.use_fn(|mut config| async move {
        config.headers.insert("Authorization", "Bearer t");
        Ok(config)
    });
    client.interceptors().response.use_fns(
        |response| async move { Ok(response) },
        |error| async move {
            if error.is_network() {
                Ok(xhr_pipeline::Response {
                    status: 503,
                    ..Default::default()
                })
            } else {
                Err(error)
            }
        },
    );

    let response = client.get("/r", None, None).await.unwrap();
    assert_eq!(response.status, 503);
    assert_eq!(transport.requests()[0].header_values("authorization"), vec!["Bearer t"]);

    assert!(client.interceptors().request.eject(auth));
    client.get("/r", None, None).await.unwrap();
    assert!(transport.requests()[1].header_values("authorization").is_empty());
}

#[tokio::test]
async fn test_default_headers_and_override() {
    let config = ClientConfig {
        base_url: Some("http://h/api/".to_string()),
        headers: [("X-Client", "pipeline"), ("accept", "text/plain")].into(),
        ..Default::default()
    };
    let (client, transport) = client_with(config, MockReply::default());

    let options = RequestConfig::default().header("x-client", "override");
    client.delete("/items/1", None, Some(options)).await.unwrap();

    let sent = &transport.requests()[0];
    assert_eq!(sent.url.as_deref(), Some("http://h/api/items/1"));
    assert_eq!(sent.header_values("x-client"), vec!["override"]);
    assert_eq!(sent.header_values("accept"), vec!["text/plain"]);
    assert_eq!(client.config().headers.get_str("X-Client"), Some("pipeline"));
}

#[tokio::test]
async fn test_logging_enabled_client() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let config = ClientConfig {
        base_url: Some("http://h".to_string()),
        enable_logging: true,
        ..Default::default()
    };
    let (client, _) = client_with(config, MockReply::json(200, r#"{"n":1}"#));

    let response = client.get("/r", None, None).await?;
    let body: serde_json::Value = response.json()?;
    assert_eq!(body["n"], 1);
    Ok(())
}

#[tokio::test]
async fn test_zero_timeout_means_no_timeout() {
    let config = ClientConfig {
        base_url: Some("http://h".to_string()),
        request_timeout_ms: 250,
        ..Default::default()
    };
    let (client, transport) = client_with(config, MockReply::text(200, "ok"));

    let options = RequestConfig::default().timeout(Duration::ZERO);
    let response = client.get("/z", None, Some(options)).await.unwrap();

    assert_eq!(response.data, ResponseData::Text("ok".into()));
    assert_eq!(transport.requests()[0].timeout, None);
}

#[tokio::test]
async fn test_post_null_sends_no_body() {
    let (client, transport) = mock_client(MockReply::default());
    client.post("/r", json!(null), None).await.unwrap();

    let sent = &transport.requests()[0];
    assert_eq!(sent.body, None);
    assert!(sent.header_values("content-type").is_empty());
}
