//! Named endpoint bindings.
//!
//! [`Endpoints::bind`] turns a table of endpoint definitions into callables
//! on a client. A definition is one of:
//!
//! - a template string, `"METHOD /path/:param"` or just `"/path"` for `GET`
//! - a full [`RequestConfig`], sent as is
//! - a handler function receiving the client and the call arguments
//!
//! For templates, each `:param` is filled from the argument of the same
//! name, which is then removed. Remaining arguments become the JSON body for
//! `POST`, `PUT` and `PATCH` and query params otherwise.
//!
//! # Examples
//!
//! ```
//! use xhr_pipeline::client::{Endpoint, Endpoints};
//! use xhr_pipeline::transport::mock::{MockReply, MockTransportFactory};
//! use xhr_pipeline::{ClientConfig, HttpClient};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransportFactory::new(MockReply::json(200, "{}"));
//! let client = HttpClient::with_transport(ClientConfig::default(), Arc::new(transport.clone()));
//!
//! let api = Endpoints::bind(client, BTreeMap::from([
//!     ("user".to_string(), Endpoint::from("GET http://h/users/:id")),
//! ]));
//! let args = json!({"id": 7, "fields": "name"});
//! api.call("user", args.as_object().cloned().unwrap_or_default()).await.unwrap();
//!
//! assert_eq!(transport.requests()[0].url.as_deref(), Some("http://h/users/7?fields=name"));
//! # });
//! ```

use futures::future::BoxFuture;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use super::fetch::HttpClient;
use crate::error::{HttpError, Result};
use crate::protocol::{Params, Payload};
use crate::types::{RequestConfig, Response};

static TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\s+(.+)$").expect("valid template regex")
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("valid placeholder regex"));

/// Handler bound to an endpoint name.
pub type EndpointFn = Arc<dyn Fn(HttpClient, Map<String, Value>) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

/// One endpoint definition.
#[derive(Clone)]
pub enum Endpoint {
    /// `"METHOD /path/:param"` template.
    Path(String),
    /// Fixed request, arguments are ignored.
    Options(RequestConfig),
    /// Custom handler.
    Handler(EndpointFn),
}

impl Endpoint {
    /// Wrap an async function as an endpoint.
    pub fn handler<F, Fut>(f: F) -> Self
    where
        F: Fn(HttpClient, Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response>> + Send + 'static,
    {
        Endpoint::Handler(Arc::new(move |client, args| Box::pin(f(client, args))))
    }
}

impl From<&str> for Endpoint {
    fn from(template: &str) -> Self {
        Endpoint::Path(template.to_string())
    }
}

impl From<RequestConfig> for Endpoint {
    fn from(config: RequestConfig) -> Self {
        Endpoint::Options(config)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Path(t) => f.debug_tuple("Path").field(t).finish(),
            Endpoint::Options(c) => f.debug_tuple("Options").field(c).finish(),
            Endpoint::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Endpoint table bound to a client.
#[derive(Clone, Debug)]
pub struct Endpoints {
    client: HttpClient,
    table: BTreeMap<String, Endpoint>,
}

impl Endpoints {
    /// Bind `schema` to `client`.
    pub fn bind(client: HttpClient, schema: BTreeMap<String, Endpoint>) -> Self {
        Endpoints { client, table: schema }
    }

    /// Bound endpoint names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Invoke endpoint `name` with `args`.
    pub async fn call(&self, name: &str, args: Map<String, Value>) -> Result<Response> {
        let endpoint = self
            .table
            .get(name)
            .ok_or_else(|| HttpError::Endpoint(format!("no endpoint named {name}")))?;

        match endpoint {
            Endpoint::Path(template) => self.client.request(expand_template(template, args)?).await,
            Endpoint::Options(config) => self.client.request(config.clone()).await,
            Endpoint::Handler(handler) => handler(self.client.clone(), args).await,
        }
    }
}

/// Build the request described by `template`, consuming `args`.
pub fn expand_template(template: &str, mut args: Map<String, Value>) -> Result<RequestConfig> {
    let template = template.trim();
    let (method, path) = match TEMPLATE.captures(template) {
        Some(caps) => (caps[1].to_ascii_uppercase(), caps[2].trim().to_string()),
        None => ("GET".to_string(), template.to_string()),
    };

    let mut url = String::with_capacity(path.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(&path) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = args
            .remove(name.as_str())
            .ok_or_else(|| HttpError::Endpoint(format!("missing path parameter {}", name.as_str())))?;
        url.push_str(&path[last..whole.start()]);
        url.push_str(&encode_segment(&value));
        last = whole.end();
    }
    url.push_str(&path[last..]);

    let mut config = RequestConfig::new(url).method(method.as_str());
    if !args.is_empty() {
        if matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
            config.data = Payload::Json(Value::Object(args));
        } else {
            config.params = Params::from(args);
        }
    }
    Ok(config)
}

fn encode_segment(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ::url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
