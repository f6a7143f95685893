//! The application object.
//!
//! Owns the controllers and the routing settings, builds the route table
//! on first use, and handles one request end-to-end.

use std::sync::{Arc, Mutex};

use arc_swap::{ArcSwap, ArcSwapOption};
use axum::http::StatusCode;

use crate::app::controller::{Controller, ControllerBuilder};
use crate::config::RoutingConfig;
use crate::dispatch::{dispatch, BoxError, DispatchError, Exchange, Reply, RequestScope};
use crate::http::{Request, Response};
use crate::observability::metrics::{self, RequestOutcome};
use crate::routing::{AnyMatcher, Matcher, RouteRegistry, RouteResult};

/// Produces the reply for a request no route matched.
pub type RescueHook = Arc<dyn Fn(&Request) -> Result<Reply, BoxError> + Send + Sync>;

/// Produces the reply for a request whose dispatch failed.
pub type ErrorHook = Arc<dyn Fn(&Request, &DispatchError) -> Result<Reply, BoxError> + Send + Sync>;

pub struct Application {
    controllers: Vec<Arc<dyn Controller>>,
    routing: ArcSwap<RoutingConfig>,
    assets: ArcSwap<AnyMatcher>,
    registry: ArcSwapOption<RouteRegistry>,
    load_lock: Mutex<()>,
    on_not_found: RescueHook,
    on_error: ErrorHook,
}

impl Application {
    pub fn new(routing: RoutingConfig) -> Self {
        let assets = AnyMatcher::globs(routing.static_assets.iter().cloned());
        Self {
            controllers: Vec::new(),
            routing: ArcSwap::from_pointee(routing),
            assets: ArcSwap::from_pointee(assets),
            registry: ArcSwapOption::empty(),
            load_lock: Mutex::new(()),
            on_not_found: Arc::new(|request: &Request| Ok(Reply::not_routed(request))),
            on_error: Arc::new(|_: &Request, _: &DispatchError| {
                Ok(Reply::internal_error("Internal Server Error"))
            }),
        }
    }

    pub fn controller(mut self, controller: impl Controller) -> Self {
        self.controllers.push(Arc::new(controller));
        self
    }

    /// Replace the rescue hook run for unmatched requests.
    pub fn on_not_found<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        self.on_not_found = Arc::new(hook);
        self
    }

    /// Replace the exception hook run when dispatch fails.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &DispatchError) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        self.on_error = Arc::new(hook);
        self
    }

    pub fn routing(&self) -> Arc<RoutingConfig> {
        self.routing.load_full()
    }

    /// The sealed route table, built on first call.
    ///
    /// Concurrent first callers wait for one load; a failed load is
    /// retried by the next caller.
    pub fn registry(&self) -> RouteResult<Arc<RouteRegistry>> {
        if let Some(registry) = self.registry.load_full() {
            return Ok(registry);
        }

        let _loading = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(registry) = self.registry.load_full() {
            return Ok(registry);
        }

        let registry = Arc::new(self.build(&self.routing.load())?);
        self.registry.store(Some(Arc::clone(&registry)));
        Ok(registry)
    }

    fn build(&self, routing: &RoutingConfig) -> RouteResult<RouteRegistry> {
        let mut registry = RouteRegistry::new(routing.registry_options());

        for controller in &self.controllers {
            let mut builder = ControllerBuilder::new(controller.name(), controller.base_paths());
            controller.configure(&mut builder);
            let added = builder.install(&mut registry)?;
            tracing::debug!(controller = %controller.name(), routes = added, "Controller loaded");
        }

        registry.normalize();
        metrics::set_route_table_size(registry.len());
        tracing::info!(
            controllers = self.controllers.len(),
            routes = registry.len(),
            "Route table loaded"
        );
        Ok(registry)
    }

    /// Rebuild the route table with new routing flags and swap it in.
    ///
    /// The current table stays active if the rebuild fails. Requests
    /// already dispatching keep the table they started with.
    pub fn reload(&self, routing: RoutingConfig) -> RouteResult<()> {
        let _loading = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());

        if *self.routing.load_full() == routing && self.registry.load().is_some() {
            tracing::debug!("Routing configuration unchanged");
            return Ok(());
        }

        let registry = self.build(&routing)?;
        self.assets
            .store(Arc::new(AnyMatcher::globs(routing.static_assets.iter().cloned())));
        self.routing.store(Arc::new(routing));
        self.registry.store(Some(Arc::new(registry)));
        tracing::info!("Route table reloaded");
        Ok(())
    }

    /// Drop the route table. The next request loads it again.
    pub fn teardown(&self) {
        let _loading = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.registry.swap(None).is_some() {
            metrics::set_route_table_size(0);
            tracing::info!("Route table torn down");
        }
    }

    /// Whether `path` bypasses routing and is served from the static root.
    pub fn is_static_asset(&self, path: &str) -> bool {
        self.assets.load().matches(path)
    }

    /// Dispatch one request and produce its response.
    pub fn handle(&self, request: Request) -> Response {
        let _scope = RequestScope::enter();
        let verb = request.method().as_str().to_string();
        let mut exchange = Exchange::new(request);

        let result = self
            .registry()
            .map_err(DispatchError::from)
            .and_then(|registry| dispatch(&registry, &mut exchange));

        match result {
            Ok(true) => {
                metrics::record_request(&verb, RequestOutcome::Handled);
                exchange.into_response()
            }
            Ok(false) => {
                metrics::record_request(&verb, RequestOutcome::Unmatched);
                let reply = (self.on_not_found)(exchange.request());
                finish(exchange, reply)
            }
            Err(e) => {
                tracing::error!(
                    method = %verb,
                    path = %exchange.request().path(),
                    request_id = exchange.request().request_id().unwrap_or("-"),
                    error = %e,
                    "Dispatch failed"
                );
                metrics::record_request(&verb, RequestOutcome::Failed);
                exchange.reset_response();
                let reply = (self.on_error)(exchange.request(), &e);
                finish(exchange, reply)
            }
        }
    }
}

/// Apply a hook's reply, degrading to a bare 500 when the hook failed.
fn finish(mut exchange: Exchange, reply: Result<Reply, BoxError>) -> Response {
    match reply {
        Ok(reply) => {
            exchange.apply(&reply);
            exchange.into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Response hook failed");
            let mut response = Response::new();
            response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            response.set_content_type("text/plain; charset=utf-8");
            response.set_body("Internal Server Error");
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{HandlerResult, Interceptor, Outcome};
    use crate::routing::RouteError;
    use axum::http::Method;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Pages;

    impl Controller for Pages {
        fn name(&self) -> &str {
            "pages"
        }

        fn configure(&self, routes: &mut ControllerBuilder) {
            routes
                .get("/hello/:name", "hello", |ex: &mut Exchange| -> HandlerResult {
                    let name = ex.path_param("name").unwrap_or("nobody").to_string();
                    Ok(Reply::text(format!("hello {name}")).into())
                })
                .get("/boom", "boom", |_: &mut Exchange| -> HandlerResult {
                    Err(Box::new(io::Error::other("kaput")))
                });
        }
    }

    fn app() -> Application {
        Application::new(RoutingConfig::default()).controller(Pages)
    }

    fn get(path: &str) -> Request {
        Request::new(Method::GET, path)
    }

    #[test]
    fn test_handle_matched_route() {
        let response = app().handle(get("/hello/ada"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_text(), "hello ada");
    }

    #[test]
    fn test_unmatched_uses_default_rescue() {
        let response = app().handle(get("/missing"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "GET /missing");
    }

    #[test]
    fn test_custom_rescue_hook() {
        let app = app().on_not_found(|_| Ok(Reply::redirect("home")));
        let response = app.handle(get("/missing"));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/home"));
    }

    #[test]
    fn test_unhandled_error_uses_error_hook() {
        let response = app().handle(get("/boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body_text().contains("Internal Server Error"));
    }

    #[test]
    fn test_failing_hook_degrades_to_plain_500() {
        let app = app().on_error(|_, _| Err("hook broke".into()));
        let response = app.handle(get("/boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_text(), "Internal Server Error");
    }

    #[test]
    fn test_registry_is_built_once() {
        let app = app();
        let first = app.registry().unwrap();
        let second = app.registry().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_teardown_forces_rebuild() {
        let app = app();
        let first = app.registry().unwrap();
        app.teardown();
        let second = app.registry().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reload_applies_case_sensitivity() {
        let app = app();
        assert_eq!(app.handle(get("/HELLO/ada")).status(), StatusCode::OK);

        app.reload(RoutingConfig {
            case_sensitive: true,
            ..RoutingConfig::default()
        })
        .unwrap();
        assert_eq!(app.handle(get("/HELLO/ada")).status(), StatusCode::NOT_FOUND);
        assert!(app.routing().case_sensitive);
    }

    struct Broken;

    impl Controller for Broken {
        fn configure(&self, routes: &mut ControllerBuilder) {
            routes.get("/bad/(unclosed", "bad", |_: &mut Exchange| -> HandlerResult { Ok(Outcome::Continue) });
        }
    }

    #[test]
    fn test_malformed_route_fails_load() {
        let app = Application::new(RoutingConfig::default()).controller(Broken);
        assert!(matches!(app.registry(), Err(RouteError::UnbalancedGroup { .. })));
        assert!(matches!(app.registry(), Err(RouteError::UnbalancedGroup { .. })));
    }

    struct Twice;

    impl Controller for Twice {
        fn configure(&self, routes: &mut ControllerBuilder) {
            routes
                .get("/x", "a", |_: &mut Exchange| -> HandlerResult { Ok(Reply::text("a").into()) })
                .get("/x", "b", |_: &mut Exchange| -> HandlerResult { Ok(Reply::text("b").into()) });
        }
    }

    #[test]
    fn test_failed_reload_keeps_current_table() {
        let app = Application::new(RoutingConfig::default()).controller(Twice);
        let before = app.registry().unwrap();

        let err = app.reload(RoutingConfig {
            reject_duplicates: true,
            ..RoutingConfig::default()
        });
        assert!(matches!(err, Err(RouteError::Duplicate { .. })));
        assert!(!app.routing().reject_duplicates);
        assert!(Arc::ptr_eq(&before, &app.registry().unwrap()));
        assert_eq!(app.handle(get("/x")).body_text(), "a");
    }

    #[test]
    fn test_static_asset_globs() {
        let app = app();
        assert!(app.is_static_asset("/assets/app.css"));
        assert!(app.is_static_asset("/favicon.ico"));
        assert!(!app.is_static_asset("/hello/ada"));
    }

    #[test]
    fn test_interceptors_run_through_application() {
        struct Counted(Arc<AtomicUsize>);
        impl Controller for Counted {
            fn name(&self) -> &str {
                "counted"
            }
            fn configure(&self, routes: &mut ControllerBuilder) {
                let hits = Arc::clone(&self.0);
                routes
                    .get("/count", "count", |_: &mut Exchange| -> HandlerResult { Ok(Reply::Ok.into()) })
                    .interceptor(Interceptor::before("hit", move |_| {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok(Outcome::Continue)
                    }));
            }
        }

        let hits = Arc::new(AtomicUsize::new(0));
        let app = Application::new(RoutingConfig::default()).controller(Counted(Arc::clone(&hits)));
        app.handle(get("/count"));
        app.handle(get("/count"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
