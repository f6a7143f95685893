//! Compiled routes and match results.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::Handler;
use crate::routing::error::RouteResult;
use crate::routing::parser::CompileOptions;
use crate::routing::pattern::{PathParams, PathPattern};
use crate::routing::verb::HttpVerb;

/// What a route invokes: the owning controller, the action name and the
/// handler closure captured at registration.
#[derive(Clone)]
pub struct RouteTarget {
    controller: Arc<str>,
    action: Arc<str>,
    handler: Handler,
}

impl RouteTarget {
    pub fn new(controller: impl Into<Arc<str>>, action: impl Into<Arc<str>>, handler: Handler) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
            handler,
        }
    }

    /// Controller id used to look up interceptor chains.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// `controller.action`, the name interceptor scopes match against.
    pub fn qualified_action(&self) -> String {
        format!("{}.{}", self.controller, self.action)
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTarget")
            .field("controller", &self.controller)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// One verb + path spec bound to a handler.
///
/// Identity is `(verb, raw path)` with the path compared ignoring ASCII case.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    verb: HttpVerb,
    pattern: PathPattern,
    target: RouteTarget,
}

impl CompiledRoute {
    pub fn new(
        verb: HttpVerb,
        spec: &str,
        target: RouteTarget,
        options: CompileOptions,
    ) -> RouteResult<Self> {
        Ok(Self {
            verb,
            pattern: PathPattern::compile(spec, options)?,
            target,
        })
    }

    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    pub fn raw_path(&self) -> &str {
        self.pattern.spec()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    pub fn is_dynamic(&self) -> bool {
        self.pattern.is_dynamic()
    }

    /// True when this route was registered under the same verb and path.
    pub fn same_key(&self, verb: HttpVerb, raw_path: &str) -> bool {
        self.verb == verb && self.raw_path().eq_ignore_ascii_case(raw_path)
    }

    /// Match `path` against this route.
    pub fn match_path(self: &Arc<Self>, path: &str) -> Option<MatchResult> {
        self.pattern.captures(path).map(|params| MatchResult {
            route: Arc::clone(self),
            params,
        })
    }
}

impl PartialEq for CompiledRoute {
    fn eq(&self, other: &Self) -> bool {
        self.same_key(other.verb, other.raw_path())
    }
}

impl Eq for CompiledRoute {}

impl fmt::Display for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.verb,
            self.raw_path(),
            self.target.qualified_action()
        )
    }
}

/// A route that matched a request, with the parameters it extracted.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub route: Arc<CompiledRoute>,
    pub params: PathParams,
}
