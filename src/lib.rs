//! Route Dispatch Library
//!
//! Compiles Express-style path patterns, matches requests against a
//! per-verb route table and runs the matched handler inside a chain of
//! before, after, catch and finally interceptors.

// Core subsystems
pub mod app;
pub mod dispatch;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use app::{Application, Controller, ControllerBuilder};
pub use config::AppConfig;
pub use dispatch::{Exchange, HandlerResult, Interceptor, InterceptorGroup, Outcome, Reply};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{HttpVerb, PathPattern, RouteRegistry};
