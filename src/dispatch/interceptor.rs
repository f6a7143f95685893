//! Interceptors: before/after/catch/finally hooks around route handlers.
//!
//! # Responsibilities
//! - Wrap user closures behind one calling convention per kind
//! - Decide whether an interceptor applies to a route (`only` / `unless`)
//! - Decide whether a catch interceptor handles an error (declared types)
//! - Bundle reusable interceptors into groups (`with`)
//!
//! # Scope Rules
//! ```text
//! "show"          bare action name   → matched against the route's action
//! "app::Users.*"  contains '.'       → matched against "controller.action"
//! "/admin/*"      contains '/'       → matched against the request path
//! ```
//! `unless` wins over `only`; an empty `only` list applies everywhere.

use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::context::Exchange;
use crate::dispatch::outcome::Outcome;
use crate::dispatch::{BoxError, DynError, HandlerResult};
use crate::routing::matcher::{Matcher, WildcardMatcher};
use crate::routing::RouteTarget;

/// When an interceptor runs relative to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorKind {
    Before,
    After,
    Catch,
    Finally,
}

type InterceptorFn = Arc<dyn Fn(&mut Exchange, Option<&DynError>) -> HandlerResult + Send + Sync>;

/// Returns true when an error is of one specific type.
type ErrorFilter = fn(&(dyn StdError + 'static)) -> bool;

fn is_type<E: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<E>()
}

/// A hook attached to a controller.
#[derive(Clone)]
pub struct Interceptor {
    name: Arc<str>,
    kind: InterceptorKind,
    priority: i32,
    scope: Scope,
    errors: Vec<(ErrorFilter, &'static str)>,
    action: InterceptorFn,
}

impl Interceptor {
    fn new(name: impl Into<Arc<str>>, kind: InterceptorKind, action: InterceptorFn) -> Self {
        Self {
            name: name.into(),
            kind,
            priority: 0,
            scope: Scope::default(),
            errors: Vec::new(),
            action,
        }
    }

    /// Runs before the handler. A `Reply` skips the handler and the after chain.
    pub fn before<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(name, InterceptorKind::Before, Arc::new(move |ex: &mut Exchange, _: Option<&DynError>| f(ex)))
    }

    /// Runs after a successful handler. A `Reply` replaces the handler's.
    pub fn after<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(name, InterceptorKind::After, Arc::new(move |ex: &mut Exchange, _: Option<&DynError>| f(ex)))
    }

    /// Handles errors raised by the handler or by before/after interceptors.
    pub fn catch<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&mut Exchange, &DynError) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(
            name,
            InterceptorKind::Catch,
            Arc::new(move |ex: &mut Exchange, error: Option<&DynError>| match error {
                Some(error) => f(ex, error),
                None => Ok(Outcome::Continue),
            }),
        )
    }

    /// Runs last on every path, with the error if one occurred.
    pub fn finally<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&mut Exchange, Option<&DynError>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::new(
            name,
            InterceptorKind::Finally,
            Arc::new(move |ex: &mut Exchange, error: Option<&DynError>| {
                f(ex, error).map(|()| Outcome::Continue)
            }),
        )
    }

    /// Lower runs first. Defaults to 0.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restrict to matching actions or paths.
    pub fn only<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scope.only.extend(rules.into_iter().filter_map(|r| ScopeRule::parse(r.as_ref())));
        self
    }

    /// Exclude matching actions or paths.
    pub fn unless<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scope.unless.extend(rules.into_iter().filter_map(|r| ScopeRule::parse(r.as_ref())));
        self
    }

    /// Handle errors of type `E` (or caused by one). Without any declared
    /// type a catch interceptor handles every error.
    pub fn catching<E: StdError + 'static>(mut self) -> Self {
        self.errors.push((is_type::<E>, type_name::<E>()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InterceptorKind {
        self.kind
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Whether this interceptor should run for `target` serving `path`.
    pub fn applies_to(&self, target: &RouteTarget, path: &str) -> bool {
        !self.scope.excludes(target, path)
    }

    /// Whether this catch interceptor handles `error`.
    ///
    /// Walks the `source()` chain, so a wrapped error matches its cause.
    pub fn handles(&self, error: &DynError) -> bool {
        if self.errors.is_empty() {
            return true;
        }

        let mut current: Option<&(dyn StdError + 'static)> = Some(error as &(dyn StdError + 'static));
        while let Some(err) = current {
            if self.errors.iter().any(|(filter, _)| filter(err)) {
                return true;
            }
            current = err.source();
        }
        false
    }

    pub fn call(&self, exchange: &mut Exchange, error: Option<&DynError>) -> HandlerResult {
        (self.action)(exchange, error)
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("scope", &self.scope)
            .field("errors", &self.errors.iter().map(|(_, name)| *name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
enum ScopeRule {
    Action(WildcardMatcher),
    Qualified(WildcardMatcher),
    Path(WildcardMatcher),
}

impl ScopeRule {
    fn parse(rule: &str) -> Option<Self> {
        let rule = rule.trim();
        if rule.is_empty() {
            return None;
        }

        Some(if rule.contains('/') {
            let rule = if rule.starts_with('/') {
                rule.to_string()
            } else {
                format!("/{rule}")
            };
            ScopeRule::Path(WildcardMatcher::new(rule, false))
        } else if rule.contains('.') {
            ScopeRule::Qualified(WildcardMatcher::new(rule, false))
        } else {
            ScopeRule::Action(WildcardMatcher::new(rule, false))
        })
    }

    fn matches(&self, target: &RouteTarget, path: &str) -> bool {
        match self {
            ScopeRule::Action(m) => m.matches(target.action()),
            ScopeRule::Qualified(m) => m.matches(&target.qualified_action()),
            ScopeRule::Path(m) => m.matches(path),
        }
    }
}

/// `only` / `unless` filters of one interceptor.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    only: Vec<ScopeRule>,
    unless: Vec<ScopeRule>,
}

impl Scope {
    /// True when the interceptor must be skipped for this route and path.
    pub fn excludes(&self, target: &RouteTarget, path: &str) -> bool {
        if self.unless.iter().any(|rule| rule.matches(target, path)) {
            return true;
        }
        !self.only.is_empty() && !self.only.iter().any(|rule| rule.matches(target, path))
    }

    pub fn is_empty(&self) -> bool {
        self.only.is_empty() && self.unless.is_empty()
    }
}

/// Interceptor lists of one controller, one per kind.
#[derive(Debug, Default)]
pub struct InterceptorChains {
    before: Vec<Interceptor>,
    after: Vec<Interceptor>,
    catch: Vec<Interceptor>,
    finally: Vec<Interceptor>,
}

impl InterceptorChains {
    pub const fn new() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
            catch: Vec::new(),
            finally: Vec::new(),
        }
    }

    pub fn push(&mut self, interceptor: Interceptor) {
        match interceptor.kind() {
            InterceptorKind::Before => self.before.push(interceptor),
            InterceptorKind::After => self.after.push(interceptor),
            InterceptorKind::Catch => self.catch.push(interceptor),
            InterceptorKind::Finally => self.finally.push(interceptor),
        }
    }

    /// Stable ascending sort; equal priorities keep declaration order.
    pub fn sort_by_priority(&mut self) {
        for chain in [&mut self.before, &mut self.after, &mut self.catch, &mut self.finally] {
            chain.sort_by_key(Interceptor::priority);
        }
    }

    pub fn before(&self) -> &[Interceptor] {
        &self.before
    }

    pub fn after(&self) -> &[Interceptor] {
        &self.after
    }

    pub fn catch(&self) -> &[Interceptor] {
        &self.catch
    }

    pub fn finally(&self) -> &[Interceptor] {
        &self.finally
    }
}

/// A reusable bundle of interceptors, attached with `ControllerBuilder::with`.
///
/// Groups may include other groups; attaching one flattens the whole tree.
#[derive(Debug, Clone, Default)]
pub struct InterceptorGroup {
    name: String,
    interceptors: Vec<Interceptor>,
    groups: Vec<InterceptorGroup>,
}

impl InterceptorGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn interceptor(mut self, interceptor: Interceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with(mut self, group: InterceptorGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every interceptor in this group and its nested groups, depth first.
    pub fn flatten(&self) -> Vec<Interceptor> {
        let mut out = self.interceptors.clone();
        for group in &self.groups {
            out.extend(group.flatten());
        }
        out
    }
}
