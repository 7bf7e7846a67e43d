//! Deferred HTTP client.
//!
//! Every helper returns a [`Pending`] immediately. The exchange itself runs when the
//! pending result is first awaited. No retries are performed: a failed request is a
//! definitive failure.

use crate::error::Failure;
use crate::pending::{Pending, Settled};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, ORIGIN};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Synthetic cross-site origin sent with preflight requests.
pub const PREFLIGHT_ORIGIN: &str = "http://someplace.com";

const APPLICATION_JSON: &str = "application/json";

/// HTTP methods the harness issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Options,
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    fn as_method(self) -> reqwest::Method {
        match self {
            Verb::Options => reqwest::Method::OPTIONS,
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Patch => reqwest::Method::PATCH,
            Verb::Delete => reqwest::Method::DELETE,
        }
    }

    /// Verbs that read or write a JSON document and therefore send `Accept`.
    fn accepts_json(self) -> bool {
        matches!(self, Verb::Get | Verb::Post | Verb::Put | Verb::Patch)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

/// Update semantics selectable for [`HttpClient::mutate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Full replace.
    Put,
    /// Partial update.
    Patch,
}

impl From<Update> for Verb {
    fn from(update: Update) -> Self {
        match update {
            Update::Put => Verb::Put,
            Update::Patch => Verb::Patch,
        }
    }
}

/// A fully described request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Verb,
    target: String,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
}

impl RequestDescriptor {
    /// Describe a request, adding the JSON negotiation headers the verb calls for.
    pub fn new(method: Verb, target: impl Into<String>, body: Option<Value>) -> Self {
        let mut headers = BTreeMap::new();
        if method.accepts_json() {
            headers.insert(ACCEPT.as_str().to_string(), APPLICATION_JSON.to_string());
        }
        if body.is_some() {
            headers.insert(
                CONTENT_TYPE.as_str().to_string(),
                APPLICATION_JSON.to_string(),
            );
        }

        Self {
            method,
            target: target.into(),
            headers,
            body,
        }
    }

    /// Add or replace a header. Names are stored lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn method(&self) -> Verb {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    fn label(&self) -> String {
        format!("{} {}", self.method, self.target)
    }
}

/// Captured response. Header names are lower-cased.
///
/// A JSON body is parsed; any other non-empty body is kept as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl ResponseSnapshot {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The header map as a JSON object, for facet assertions.
    pub fn headers_value(&self) -> Value {
        Value::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Client issuing deferred requests.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    http_client: Client,
}

impl HttpClient {
    /// Create a client with the transport's default settings (no request timeout).
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
        }
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }

    /// Issue a request described by `descriptor`.
    pub fn issue(&self, descriptor: RequestDescriptor) -> Pending {
        let label = descriptor.label();
        let http_client = self.http_client.clone();
        Pending::new(label, exchange(http_client, descriptor))
    }

    /// `OPTIONS` with a cross-site `Origin`.
    pub fn preflight(&self, url: &str) -> Pending {
        self.issue(
            RequestDescriptor::new(Verb::Options, url, None)
                .with_header(ORIGIN.as_str(), PREFLIGHT_ORIGIN),
        )
    }

    /// `POST` a JSON payload.
    pub fn create<T: Serialize + ?Sized>(&self, url: &str, payload: &T) -> Pending {
        self.with_json_body(Verb::Post, url, payload)
    }

    /// `GET` without a body.
    pub fn read(&self, url: &str) -> Pending {
        self.issue(RequestDescriptor::new(Verb::Get, url, None))
    }

    /// `DELETE` without a body.
    pub fn remove(&self, url: &str) -> Pending {
        self.issue(RequestDescriptor::new(Verb::Delete, url, None))
    }

    /// `PUT` or `PATCH` a JSON payload.
    pub fn mutate<T: Serialize + ?Sized>(&self, url: &str, update: Update, payload: &T) -> Pending {
        self.with_json_body(update.into(), url, payload)
    }

    fn with_json_body<T: Serialize + ?Sized>(&self, verb: Verb, url: &str, payload: &T) -> Pending {
        match serde_json::to_value(payload) {
            Ok(body) => self.issue(RequestDescriptor::new(verb, url, Some(body))),
            Err(e) => Pending::rejected(
                format!("{} {}", verb, url),
                Failure::decode(format!("payload is not serializable: {}", e)),
            ),
        }
    }
}

async fn exchange(http_client: Client, descriptor: RequestDescriptor) -> Settled {
    let url = descriptor.target.as_str();

    let mut request = http_client.request(descriptor.method.as_method(), url);
    for (name, value) in &descriptor.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &descriptor.body {
        let bytes = serde_json::to_vec(body).map_err(|e| Failure::decode(e.to_string()))?;
        request = request.body(bytes);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Failure::transport(url, e))?;

    let status = response.status();
    let headers = lowercase_headers(response.headers());
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Failure::transport(url, e))?;

    let snapshot = ResponseSnapshot {
        status: status.as_u16(),
        headers,
        body: parse_body(&bytes),
    };

    debug!(
        method = %descriptor.method,
        url = %url,
        status = snapshot.status,
        "Request settled"
    );

    if status.is_success() || status.is_redirection() {
        Ok(Arc::new(snapshot))
    } else {
        Err(Failure::status(snapshot))
    }
}

fn lowercase_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

fn parse_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}
