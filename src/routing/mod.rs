//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at load):
//!     path spec ("/users/:id(\d+)")
//!     → parser.rs (tokens → regex source + parameter slots)
//!     → pattern.rs (anchored regex, slot count checked)
//!     → route.rs (verb + pattern + handler target)
//!     → registry.rs (verb buckets; sealed by normalize())
//!
//! Incoming Request (verb, path):
//!     → registry.rs (first match in verb bucket, static routes first)
//!     → pattern.rs (named + splat parameters)
//!     → Return: MatchResult or None
//! ```
//!
//! # Design Decisions
//! - Malformed specs fail at registration, never while matching
//! - Route table is immutable after normalize(); no locks on the hot path
//! - Deterministic: same input always matches same route
//! - First match wins (static before dynamic, then registration order)

pub mod error;
pub mod key;
pub mod matcher;
pub mod parser;
pub mod pattern;
pub mod registry;
pub mod route;
pub mod verb;

pub use error::{RouteError, RouteResult};
pub use key::NamedKey;
pub use matcher::{AnyMatcher, Matcher, WildcardMatcher};
pub use parser::{compile_path, join_paths, normalize_path, CompileOptions};
pub use pattern::{PathParams, PathPattern};
pub use registry::{RegistryOptions, RouteRegistry};
pub use route::{CompiledRoute, MatchResult, RouteTarget};
pub use verb::HttpVerb;
