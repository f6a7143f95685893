//! Dispatch errors.

use thiserror::Error;

use crate::dispatch::BoxError;
use crate::routing::RouteError;

/// Errors that escape the dispatch pipeline.
///
/// An unmatched request is not an error; `dispatch` reports it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Dispatch was attempted before the route table was sealed.
    #[error("route table has not been normalized")]
    NotNormalized,

    /// The route table could not be built.
    #[error("route table failed to load: {0}")]
    Routes(#[from] RouteError),

    /// A handler or interceptor error that no catch interceptor absorbed.
    #[error("action {action} failed: {source}")]
    Unhandled {
        action: String,
        #[source]
        source: BoxError,
    },
}
