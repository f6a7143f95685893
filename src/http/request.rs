//! Request model seen by handlers and interceptors.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Capture method, path, decoded query pairs, headers and body
//! - Expose the normalized verb used for route lookup
//!
//! # Design Decisions
//! - Body is fully buffered before dispatch; handlers are synchronous
//! - Path is percent-decoded once; invalid UTF-8 decodes lossily to U+FFFD
//! - Repeated slashes are kept; matching collapses them itself

use axum::body::Bytes;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::{request::Parts, Method};
use percent_encoding::percent_decode_str;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::routing::{HttpVerb, RouteError};

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A buffered HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Build a request from a method and an origin-form target (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, Vec::new()),
        };

        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { decode_path(path) },
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Build a request from axum request parts and an already buffered body.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        Self {
            method: parts.method.clone(),
            path: decode_path(parts.uri.path()),
            query: parts.uri.query().map(parse_query).unwrap_or_default(),
            headers: parts.headers.clone(),
            body,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Uppercase-normalized verb, or an error for methods no route can use.
    pub fn verb(&self) -> Result<HttpVerb, RouteError> {
        self.method.as_str().parse()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value of a query parameter, in order of appearance.
    pub fn query_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }
}

fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Generates UUID v4 request ids for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}
