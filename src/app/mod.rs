//! Application subsystem.
//!
//! # Data Flow
//! ```text
//! Load (first request, or eagerly at startup):
//!     controllers
//!     → controller.rs (ControllerBuilder collects routes + interceptors)
//!     → RouteRegistry (register, normalize)
//!     → application.rs (table published behind ArcSwapOption)
//!
//! Per request:
//!     Request
//!     → application.rs (RequestScope, dispatch)
//!     → unmatched: rescue hook │ failed: error hook
//!     → Response
//! ```
//!
//! # Design Decisions
//! - The table loads once behind a latch; concurrent first requests wait
//! - Reload builds a complete new table before swapping it in
//! - Hooks are plain closures so hosts can render their own error pages

pub mod application;
pub mod controller;

pub use application::{Application, ErrorHook, RescueHook};
pub use controller::{Controller, ControllerBuilder};
