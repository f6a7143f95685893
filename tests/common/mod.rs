//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use route_dispatch::{AppConfig, Application, HttpServer, Shutdown};

/// A dispatcher host running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub app: Arc<Application>,
    pub shutdown: Shutdown,
    pub config_tx: mpsc::UnboundedSender<AppConfig>,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start `app` behind the axum host with `config`.
pub async fn spawn_server(config: AppConfig, app: Application) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Arc::new(app);
    app.registry().unwrap();

    let (config_tx, config_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let stopped = shutdown.subscribe();

    let server = HttpServer::new(&config, Arc::clone(&app));
    let handle = tokio::spawn(async move { server.run(listener, config_rx, stopped).await });

    TestServer {
        addr,
        app,
        shutdown,
        config_tx,
        handle,
    }
}

/// A fresh directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("route-dispatch-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
