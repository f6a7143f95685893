//! The per-request dispatch state machine.
//!
//! ```text
//! MATCHING ─ no route ─────────────────────────────→ Ok(false)
//!    │
//! BEFORE ── Reply ───────────────┐
//!    │                           │
//! INVOKING ─ error ─→ CATCH ─────┤
//!    │                  │        │
//! AFTER ──── error ─────┘        │
//!    │                           ▼
//!    └──────────────→ apply terminal reply
//!                                │
//!                             FINALLY ──→ Ok(true) | Err(Unhandled)
//! ```

use std::sync::Arc;

use crate::dispatch::context::Exchange;
use crate::dispatch::error::DispatchError;
use crate::dispatch::interceptor::InterceptorChains;
use crate::dispatch::outcome::{Outcome, Reply};
use crate::dispatch::{BoxError, DynError};
use crate::routing::{RouteRegistry, RouteTarget};

static NO_INTERCEPTORS: InterceptorChains = InterceptorChains::new();

/// How the handler phase ended.
enum Settled {
    /// Handler (or a before/after interceptor) produced the terminal reply.
    Reply(Reply),
    /// An error was absorbed by a catch interceptor.
    Handled(Reply, BoxError),
    /// An error nobody handled.
    Failed(BoxError),
}

/// Route the exchange's request and run the matched handler.
///
/// Returns `Ok(true)` when a route matched, `Ok(false)` when none did, and
/// an error when the handler phase failed without a catch interceptor
/// absorbing it (or a finally interceptor failed).
pub fn dispatch(registry: &RouteRegistry, exchange: &mut Exchange) -> Result<bool, DispatchError> {
    if !registry.is_normalized() {
        return Err(DispatchError::NotNormalized);
    }

    let Ok(verb) = exchange.request().verb() else {
        tracing::debug!(method = %exchange.request().method(), "No routes for method");
        return Ok(false);
    };

    let Some(matched) = registry.match_request(verb, exchange.request().path()) else {
        tracing::debug!(verb = %verb, path = %exchange.request().path(), "No route matched");
        return Ok(false);
    };

    let route = Arc::clone(&matched.route);
    exchange.set_matched(matched);

    let target = route.target();
    let chains = registry
        .chains(target.controller())
        .unwrap_or(&NO_INTERCEPTORS);
    let path = exchange.request().path().to_string();

    tracing::debug!(
        verb = %verb,
        path = %path,
        route = %route.raw_path(),
        action = %target.qualified_action(),
        "Dispatching"
    );

    let settled = match invoke(target, chains, exchange, &path) {
        Ok(reply) => Settled::Reply(reply),
        Err(error) => match catch(chains, exchange, &*error) {
            Ok(Some(reply)) => {
                tracing::debug!(action = %target.qualified_action(), error = %error, "Error handled by catch interceptor");
                Settled::Handled(reply, error)
            }
            Ok(None) => Settled::Failed(error),
            Err(catch_error) => {
                tracing::error!(
                    action = %target.qualified_action(),
                    error = %error,
                    catch_error = %catch_error,
                    "Catch interceptor failed"
                );
                Settled::Failed(catch_error)
            }
        },
    };

    if let Settled::Reply(reply) | Settled::Handled(reply, _) = &settled {
        exchange.apply(reply);
    }

    let in_flight: Option<&DynError> = match &settled {
        Settled::Reply(_) => None,
        Settled::Handled(_, error) | Settled::Failed(error) => Some(&**error),
    };
    let finally_result = finally(target, chains, exchange, &path, in_flight);

    let unhandled = |source: BoxError| DispatchError::Unhandled {
        action: target.qualified_action(),
        source,
    };

    match (settled, finally_result) {
        (Settled::Failed(error), Err(finally_error)) => {
            tracing::error!(
                action = %target.qualified_action(),
                error = %finally_error,
                "Finally interceptor failed while another error was propagating"
            );
            Err(unhandled(error))
        }
        (Settled::Failed(error), Ok(())) => Err(unhandled(error)),
        (_, Err(finally_error)) => Err(unhandled(finally_error)),
        (_, Ok(())) => Ok(true),
    }
}

/// BEFORE → INVOKING → AFTER.
fn invoke(
    target: &RouteTarget,
    chains: &InterceptorChains,
    exchange: &mut Exchange,
    path: &str,
) -> Result<Reply, BoxError> {
    for interceptor in chains.before() {
        if !interceptor.applies_to(target, path) {
            continue;
        }
        if let Outcome::Reply(reply) = interceptor.call(exchange, None)? {
            return Ok(reply);
        }
    }

    let mut reply = match (target.handler())(exchange)? {
        Outcome::Reply(reply) => reply,
        Outcome::Continue => Reply::NoResult,
    };

    for interceptor in chains.after() {
        if !interceptor.applies_to(target, path) {
            continue;
        }
        if let Outcome::Reply(replacement) = interceptor.call(exchange, None)? {
            reply = replacement;
        }
    }

    Ok(reply)
}

/// First catch interceptor whose declared error types match handles the error.
fn catch(
    chains: &InterceptorChains,
    exchange: &mut Exchange,
    error: &DynError,
) -> Result<Option<Reply>, BoxError> {
    let Some(interceptor) = chains.catch().iter().find(|i| i.handles(error)) else {
        return Ok(None);
    };

    let reply = match interceptor.call(exchange, Some(error))? {
        Outcome::Reply(reply) => reply,
        Outcome::Continue => Reply::NoResult,
    };
    Ok(Some(reply))
}

fn finally(
    target: &RouteTarget,
    chains: &InterceptorChains,
    exchange: &mut Exchange,
    path: &str,
    error: Option<&DynError>,
) -> Result<(), BoxError> {
    for interceptor in chains.finally() {
        if !interceptor.applies_to(target, path) {
            continue;
        }
        interceptor.call(exchange, error)?;
    }
    Ok(())
}
