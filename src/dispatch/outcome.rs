//! Handler outcomes and the terminal reply catalogue.

use axum::http::header::{LOCATION, WWW_AUTHENTICATE};
use axum::http::StatusCode;
use serde::Serialize;

use crate::http::{Request, Response};

/// What a handler or interceptor produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Stop here and write this reply.
    Reply(Reply),
    /// Nothing to write; keep going.
    Continue,
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        Outcome::Reply(reply)
    }
}

/// A terminal result that knows how to write itself to a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Leave the response untouched.
    NoResult,
    /// Empty 200.
    Ok,
    Text(String),
    Html(String),
    /// Pre-serialized JSON document.
    Json(String),
    Xml(String),
    Redirect { location: String, status: StatusCode },
    BadRequest(String),
    /// 401 with a `WWW-Authenticate: Basic realm=...` challenge.
    Unauthorized { realm: String },
    Forbidden(String),
    NotFound(String),
    /// HTML error page with an arbitrary status.
    Error { status: StatusCode, reason: String },
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Reply::Text(body.into())
    }

    pub fn html(body: impl Into<String>) -> Self {
        Reply::Html(body.into())
    }

    /// Serialize `value` with serde_json.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Reply::Json)
    }

    pub fn xml(body: impl Into<String>) -> Self {
        Reply::Xml(body.into())
    }

    /// 302 Found.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::redirect_with(location, StatusCode::FOUND)
    }

    /// 301 Moved Permanently.
    pub fn redirect_permanent(location: impl Into<String>) -> Self {
        Self::redirect_with(location, StatusCode::MOVED_PERMANENTLY)
    }

    pub fn redirect_with(location: impl Into<String>, status: StatusCode) -> Self {
        Reply::Redirect {
            location: location.into(),
            status,
        }
    }

    pub fn bad_request(why: impl Into<String>) -> Self {
        Reply::BadRequest(why.into())
    }

    pub fn unauthorized(realm: impl Into<String>) -> Self {
        Reply::Unauthorized { realm: realm.into() }
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        Reply::Forbidden(why.into())
    }

    pub fn not_found(why: impl Into<String>) -> Self {
        Reply::NotFound(why.into())
    }

    /// 404 describing the unrouted `METHOD path`.
    pub fn not_routed(request: &Request) -> Self {
        Reply::NotFound(format!("{} {}", request.method(), request.path()))
    }

    pub fn error(status: StatusCode, reason: impl Into<String>) -> Self {
        Reply::Error {
            status,
            reason: reason.into(),
        }
    }

    /// 500 error page.
    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, reason)
    }

    /// Status this reply writes, if it writes one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Reply::NoResult => None,
            Reply::Ok | Reply::Text(_) | Reply::Html(_) | Reply::Json(_) | Reply::Xml(_) => {
                Some(StatusCode::OK)
            }
            Reply::Redirect { status, .. } => Some(*status),
            Reply::BadRequest(_) => Some(StatusCode::BAD_REQUEST),
            Reply::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Reply::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            Reply::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Reply::Error { status, .. } => Some(*status),
        }
    }

    /// Write this reply to `response`.
    pub fn apply(&self, _request: &Request, response: &mut Response) {
        if let Some(status) = self.status() {
            response.set_status(status);
        }

        match self {
            Reply::NoResult | Reply::Ok => {}
            Reply::Text(body) => write(response, "text/plain; charset=utf-8", body),
            Reply::Html(body) => write(response, "text/html; charset=utf-8", body),
            Reply::Json(body) => write(response, "application/json; charset=utf-8", body),
            Reply::Xml(body) => write(response, "text/xml; charset=utf-8", body),
            Reply::Redirect { location, .. } => {
                response.set_header(LOCATION, &rooted(location));
            }
            Reply::Unauthorized { realm } => {
                response.set_header(WWW_AUTHENTICATE, &format!("Basic realm=\"{realm}\""));
            }
            Reply::BadRequest(why) | Reply::Forbidden(why) | Reply::NotFound(why) => {
                write(response, "text/plain; charset=utf-8", why)
            }
            Reply::Error { status, reason } => {
                write(response, "text/html; charset=utf-8", &error_page(*status, reason))
            }
        }
    }
}

fn write(response: &mut Response, content_type: &'static str, body: &str) {
    response.set_content_type(content_type);
    response.set_body(body.to_string());
}

/// Absolute URLs pass through; anything else is rooted at `/`.
fn rooted(location: &str) -> String {
    let absolute = location
        .split_once("://")
        .is_some_and(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));

    if absolute || location.starts_with('/') {
        location.to_string()
    } else {
        format!("/{location}")
    }
}

fn error_page(status: StatusCode, reason: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Error - {}</title></head>\
         <body><div style=\"padding:30px; font-size:16px; color:#cc0000; text-align:center;\">{}</div></body></html>",
        status.as_u16(),
        escape_html(reason)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn applied(reply: Reply) -> Response {
        let request = Request::new(Method::GET, "/");
        let mut response = Response::new();
        reply.apply(&request, &mut response);
        response
    }

    #[test]
    fn test_no_result_leaves_response_alone() {
        let request = Request::new(Method::GET, "/");
        let mut response = Response::new();
        response.set_status(StatusCode::ACCEPTED);
        Reply::NoResult.apply(&request, &mut response);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_json_reply() {
        #[derive(Serialize)]
        struct User {
            id: u32,
        }
        let response = applied(Reply::json(&User { id: 7 }).unwrap());
        assert_eq!(response.body_text(), r#"{"id":7}"#);
        assert_eq!(response.header("content-type"), Some("application/json; charset=utf-8"));
    }

    #[test]
    fn test_redirects() {
        let response = applied(Reply::redirect("login"));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/login"));

        let response = applied(Reply::redirect_permanent("https://example.com/x"));
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header("location"), Some("https://example.com/x"));
    }

    #[test]
    fn test_not_routed_names_method_and_path() {
        let request = Request::new(Method::DELETE, "/users/3");
        let response = {
            let mut response = Response::new();
            Reply::not_routed(&request).apply(&request, &mut response);
            response
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "DELETE /users/3");
    }

    #[test]
    fn test_unauthorized_challenge() {
        let response = applied(Reply::unauthorized("admin"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.header("www-authenticate"), Some("Basic realm=\"admin\""));
    }

    #[test]
    fn test_error_page_escapes_reason() {
        let response = applied(Reply::error(StatusCode::SERVICE_UNAVAILABLE, "<down>"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.body_text();
        assert!(body.contains("&lt;down&gt;"));
        assert!(body.contains("Error - 503"));
    }
}
