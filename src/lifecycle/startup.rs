//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Build the route table before accepting traffic
//! - Bind the listener, start the config watcher, serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::app::Application;
use crate::config::{load_config, AppConfig, ConfigError, ConfigWatcher};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::{logging, metrics};
use crate::routing::RouteError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("route table failed to load: {0}")]
    Routes(#[from] RouteError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config watcher failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Start the host for `app` and serve until a termination signal.
///
/// Without a config path the defaults are used and hot reload is off.
pub async fn run(config_path: Option<PathBuf>, app: Application) -> Result<(), StartupError> {
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "route-dispatch starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        case_sensitive = config.routing.case_sensitive,
        strict = config.routing.strict,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Arc::new(app);
    app.reload(config.routing.clone())?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    // The watcher handle must outlive the server.
    let (updates, _watcher) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let shutdown = Arc::new(Shutdown::new());
    let stopped = shutdown.subscribe();
    tokio::spawn(wait_for_signal(Arc::clone(&shutdown)));

    HttpServer::new(&config, Arc::clone(&app))
        .run(listener, updates, stopped)
        .await
        .map_err(StartupError::Serve)?;

    app.teardown();
    tracing::info!("Shutdown complete");
    Ok(())
}
