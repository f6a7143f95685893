//! Per-request execution context.

use std::time::Instant;

use crate::dispatch::binding::{BindError, FromParam, ParamSource};
use crate::dispatch::outcome::Reply;
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::routing::MatchResult;

/// The request, the response being built, and the route that matched.
///
/// Passed by `&mut` to every handler and interceptor of one request and
/// dropped when the request ends.
#[derive(Debug)]
pub struct Exchange {
    request: Request,
    response: Response,
    matched: Option<MatchResult>,
}

impl Exchange {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::new(),
            matched: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// The matched route and its parameters, once routing succeeded.
    pub fn matched(&self) -> Option<&MatchResult> {
        self.matched.as_ref()
    }

    pub(crate) fn set_matched(&mut self, matched: MatchResult) {
        self.matched = Some(matched);
    }

    /// First value of a named path parameter.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.matched.as_ref()?.params.get(name)
    }

    /// The n-th anonymous capture.
    pub fn splat(&self, index: usize) -> Option<&str> {
        self.matched.as_ref()?.params.splat(index)
    }

    /// Bind a typed argument from the given source.
    pub fn bind<T: FromParam>(&self, source: ParamSource<'_>) -> Result<T, BindError> {
        let values: Vec<&str> = match source {
            ParamSource::Path(name) => self.path_values(name),
            ParamSource::Splat(index) => self.splat(index).into_iter().collect(),
            ParamSource::Query(name) => self.request.query_all(name).collect(),
            ParamSource::Any(name) => {
                let captured = self.path_values(name);
                if captured.is_empty() {
                    self.request.query_all(name).collect()
                } else {
                    captured
                }
            }
        };

        T::from_values(&source.to_string(), &values)
    }

    fn path_values(&self, name: &str) -> Vec<&str> {
        self.matched
            .as_ref()
            .map(|m| m.params.get_all(name).iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Write a reply to the response.
    pub fn apply(&mut self, reply: &Reply) {
        reply.apply(&self.request, &mut self.response);
    }

    /// Discard anything written so far.
    pub fn reset_response(&mut self) {
        self.response = Response::new();
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Scoped accounting for one in-flight request.
///
/// Counts the request as in flight on entry; records its duration and
/// releases the in-flight slot on every exit path.
#[derive(Debug)]
pub struct RequestScope {
    started: Instant,
}

impl RequestScope {
    pub fn enter() -> Self {
        metrics::request_started();
        Self {
            started: Instant::now(),
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        metrics::request_finished(self.started);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{CompileOptions, PathPattern};
    use axum::http::Method;

    fn exchange(spec: &str, target: &str) -> Exchange {
        let mut exchange = Exchange::new(Request::new(Method::GET, target));
        let route = crate::dispatch::tests::route(spec);
        let params = PathPattern::compile(spec, CompileOptions::default())
            .unwrap()
            .captures(exchange.request().path())
            .unwrap();
        exchange.set_matched(MatchResult { route, params });
        exchange
    }

    #[test]
    fn test_bind_from_each_source() {
        let ex = exchange(r"/users/:id/(\d+)", "/users/42/9?page=2&id=99");
        assert_eq!(ex.bind::<u64>(ParamSource::Path("id")), Ok(42));
        assert_eq!(ex.bind::<u8>(ParamSource::Splat(0)), Ok(9));
        assert_eq!(ex.bind::<u32>(ParamSource::Query("page")), Ok(2));
        assert_eq!(ex.bind::<u32>(ParamSource::Any("id")), Ok(42));
        assert_eq!(ex.bind::<u32>(ParamSource::Any("page")), Ok(2));
        assert_eq!(ex.bind::<Option<u32>>(ParamSource::Query("size")), Ok(None));
    }

    #[test]
    fn test_bind_missing() {
        let ex = exchange("/users", "/users");
        assert_eq!(
            ex.bind::<u32>(ParamSource::Path("id")),
            Err(BindError::Missing("path parameter 'id'".into()))
        );
    }

    #[test]
    fn test_apply_and_reset() {
        let mut ex = Exchange::new(Request::new(Method::GET, "/"));
        ex.apply(&Reply::text("hello"));
        assert_eq!(ex.response().body_text(), "hello");
        ex.reset_response();
        assert!(ex.response().body().is_empty());
    }
}
