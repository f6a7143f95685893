//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all dispatch handler
//! - Wire up middleware (request ID, timeout, tracing)
//! - Serve static assets without routing
//! - Buffer request bodies and run handlers on the blocking pool
//! - Apply hot-reloaded routing configuration
//! - Stop on the shutdown broadcast

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request as HttpRequest, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceExt;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::Application;
use crate::config::AppConfig;
use crate::http::request::{Request, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics::{self, RequestOutcome};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
    pub max_body_bytes: usize,
}

/// HTTP host for an [`Application`].
pub struct HttpServer {
    router: Router,
    app: Arc<Application>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &AppConfig, app: Arc<Application>) -> Self {
        let state = AppState {
            app: Arc::clone(&app),
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(config, state);
        Self { router, app }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
    }

    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configurations arriving on `config_updates` rebuild the route table.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = Arc::clone(&self.app);
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = app.reload(config.routing) {
                    tracing::error!(error = %e, "Route table reload failed; keeping current routes");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: static assets, then the dispatcher.
async fn dispatch_handler(State(state): State<AppState>, request: HttpRequest<Body>) -> AxumResponse {
    let path = request.uri().path().to_string();

    if state.app.is_static_asset(&path) {
        tracing::debug!(path = %path, "Serving static asset");
        metrics::record_request(request.method().as_str(), RequestOutcome::Static);
        let root = state.app.routing().static_root.clone();
        return match ServeDir::new(root).oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        };
    }

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let request = Request::from_parts(&parts, body);
    let app = Arc::clone(&state.app);
    match tokio::task::spawn_blocking(move || app.handle(request)).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Handler task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
