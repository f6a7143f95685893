//! Response model written by replies and interceptors.
//!
//! # Responsibilities
//! - Collect status, headers and body produced during dispatch
//! - Convert into an axum response at the host boundary
//!
//! # Design Decisions
//! - Fully buffered; replies write it exactly once
//! - Invalid header values are dropped with a warning rather than failing the request

use std::borrow::Cow;

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// A buffered HTTP response.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a header from text, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => {
                tracing::warn!(header = %name, value = %value, "Dropping invalid header value");
            }
        }
    }

    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_empty_ok() {
        let response = Response::new();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_invalid_header_is_dropped() {
        let mut response = Response::new();
        response.set_header(HeaderName::from_static("x-note"), "line\nbreak");
        assert!(response.header("x-note").is_none());
        response.set_header(HeaderName::from_static("x-note"), "fine");
        assert_eq!(response.header("x-note"), Some("fine"));
    }

    #[test]
    fn test_into_axum_response() {
        let mut response = Response::new();
        response.set_status(StatusCode::CREATED);
        response.set_content_type("text/plain; charset=utf-8");
        response.set_body("made");

        let converted = response.into_response();
        assert_eq!(converted.status(), StatusCode::CREATED);
        assert_eq!(
            converted.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
