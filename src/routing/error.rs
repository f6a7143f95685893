//! Route compilation and registration errors.

use thiserror::Error;

use crate::routing::verb::HttpVerb;

/// Errors raised while compiling or registering routes.
///
/// All of these surface at startup; none of them can occur while matching
/// a request.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Parentheses or character classes in the compiled pattern do not balance.
    #[error("path <{path}> has an unmatched group in pattern <{pattern}>")]
    UnbalancedGroup { path: String, pattern: String },

    /// The compiled pattern was rejected by the regex engine.
    #[error("path <{path}> compiles to an invalid pattern: {source}")]
    InvalidPattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    /// Named keys and capture groups could not be aligned.
    #[error("path <{path}> declares {slots} parameter slots but its pattern has {groups} capture groups")]
    SlotMismatch {
        path: String,
        slots: usize,
        groups: usize,
    },

    /// A `:name` token lost its capture group, e.g. `:id(?:x)`.
    #[error("parameter :{name} in path <{path}> has no capture group")]
    OrphanKey { path: String, name: String },

    /// The same verb and path were registered twice while duplicates are rejected.
    #[error("route {verb} {path} is already registered")]
    Duplicate { verb: HttpVerb, path: String },

    /// The registry was normalized and accepts no further registrations.
    #[error("cannot register {what}: route table is sealed")]
    Sealed { what: String },

    /// Unknown HTTP verb.
    #[error("unsupported HTTP method: {0}")]
    UnknownVerb(String),
}

/// Result type for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;
