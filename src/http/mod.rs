//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, trace)
//!     → static asset? → ServeDir
//!     → request.rs (buffer body, decode query, expose request id)
//!     → Application::handle on the blocking pool
//!     → response.rs (status, headers, body written by the terminal Reply)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Request, UuidRequestId, X_REQUEST_ID};
pub use response::Response;
pub use server::{AppState, HttpServer};
