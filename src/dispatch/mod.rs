//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → context.rs (Exchange: request + response + match)
//!     → pipeline.rs (match, before, handler, after, catch, finally)
//!     → outcome.rs (terminal Reply applied to the response once)
//!     → Return: matched? / unhandled error
//! ```
//!
//! # Design Decisions
//! - Handlers return `Outcome`; a reply is a value, never an error
//! - Real failures travel as `BoxError` so handlers can use `?` freely
//! - Catch interceptors select errors by type, walking the source chain
//! - Per-request state lives in the `Exchange`; nothing is thread-local

pub mod binding;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod outcome;
pub mod pipeline;

use std::sync::Arc;

pub use binding::{BindError, FromParam, ParamSource};
pub use context::{Exchange, RequestScope};
pub use error::DispatchError;
pub use interceptor::{Interceptor, InterceptorChains, InterceptorGroup, InterceptorKind, Scope};
pub use outcome::{Outcome, Reply};
pub use pipeline::dispatch;

/// Error type carried by handlers and interceptors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Borrowed form of [`BoxError`].
pub type DynError = dyn std::error::Error + Send + Sync + 'static;

/// What handlers and interceptors return.
pub type HandlerResult = Result<Outcome, BoxError>;

/// A route handler captured at registration.
pub type Handler = Arc<dyn Fn(&mut Exchange) -> HandlerResult + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}
