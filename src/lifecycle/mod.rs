//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Logging + metrics → Build route table
//!     → Bind listener → Start config watcher → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Stop accepting → Drain in-flight → Exit
//!
//! Signals (signals.rs):
//!     Ctrl-C / SIGTERM → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then listeners
//! - Malformed routes fail startup instead of the first request
//! - One broadcast channel reaches every long-running task

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, StartupError};
