//! Route table and interceptor chains.
//!
//! # Responsibilities
//! - Store compiled routes grouped by verb
//! - Store interceptor chains grouped by controller id
//! - Seal the table once loading completes (static routes first, chains by priority)
//! - Look up the first route matching a request
//!
//! # Design Decisions
//! - Mutable only until `normalize()`; read-only and lock-free afterwards
//! - First match wins within a verb bucket
//! - Duplicates are ignored unless `reject_duplicates` is set

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::interceptor::{Interceptor, InterceptorChains};
use crate::routing::error::{RouteError, RouteResult};
use crate::routing::parser::CompileOptions;
use crate::routing::route::{CompiledRoute, MatchResult, RouteTarget};
use crate::routing::verb::HttpVerb;

/// Registry-wide flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryOptions {
    pub compile: CompileOptions,
    pub reject_duplicates: bool,
}

/// All routes and interceptors known to an application.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    options: RegistryOptions,
    routes: HashMap<HttpVerb, Vec<Arc<CompiledRoute>>>,
    interceptors: HashMap<String, InterceptorChains>,
    normalized: bool,
}

impl RouteRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    /// Compile and add a route.
    ///
    /// Returns `Ok(false)` when an identical `(verb, path)` was already
    /// registered and duplicates are tolerated.
    pub fn register(&mut self, verb: HttpVerb, spec: &str, target: RouteTarget) -> RouteResult<bool> {
        if self.normalized {
            return Err(RouteError::Sealed {
                what: format!("route {verb} {spec}"),
            });
        }

        let bucket = self.routes.entry(verb).or_default();
        if let Some(existing) = bucket.iter().find(|r| r.same_key(verb, spec)) {
            if self.options.reject_duplicates {
                return Err(RouteError::Duplicate {
                    verb,
                    path: spec.to_string(),
                });
            }
            tracing::warn!(
                verb = %verb,
                path = %spec,
                kept = %existing.target().qualified_action(),
                ignored = %target.qualified_action(),
                "Duplicate route ignored"
            );
            return Ok(false);
        }

        let route = CompiledRoute::new(verb, spec, target, self.options.compile)?;
        tracing::info!(
            verb = %verb,
            path = %spec,
            pattern = %route.pattern().as_str(),
            dynamic = route.is_dynamic(),
            action = %route.target().qualified_action(),
            "Registered route"
        );
        bucket.push(Arc::new(route));
        Ok(true)
    }

    /// Attach an interceptor to a controller.
    pub fn add_interceptor(&mut self, controller: &str, interceptor: Interceptor) -> RouteResult<()> {
        if self.normalized {
            return Err(RouteError::Sealed {
                what: format!("interceptor {} on {controller}", interceptor.name()),
            });
        }

        tracing::debug!(
            controller = %controller,
            interceptor = %interceptor.name(),
            kind = ?interceptor.kind(),
            priority = interceptor.priority(),
            "Registered interceptor"
        );
        self.interceptors
            .entry(controller.to_string())
            .or_default()
            .push(interceptor);
        Ok(())
    }

    /// Seal the table. Idempotent.
    ///
    /// Static routes move ahead of dynamic ones (registration order kept
    /// within each group) and interceptor chains are ordered by priority.
    pub fn normalize(&mut self) {
        if self.normalized {
            return;
        }

        for bucket in self.routes.values_mut() {
            bucket.sort_by_key(|route| route.is_dynamic());
        }
        for chains in self.interceptors.values_mut() {
            chains.sort_by_priority();
        }

        self.normalized = true;
        tracing::info!(
            routes = self.len(),
            controllers = self.interceptors.len(),
            "Route table sealed"
        );
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// First route for `verb` whose pattern matches `path`.
    pub fn match_request(&self, verb: HttpVerb, path: &str) -> Option<MatchResult> {
        self.routes
            .get(&verb)?
            .iter()
            .find_map(|route| route.match_path(path))
    }

    /// Routes for one verb, in match order once normalized.
    pub fn routes(&self, verb: HttpVerb) -> &[Arc<CompiledRoute>] {
        self.routes.get(&verb).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every route, grouped by verb in [`HttpVerb::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CompiledRoute>> {
        HttpVerb::ALL
            .iter()
            .flat_map(move |verb| self.routes(*verb).iter())
    }

    pub fn chains(&self, controller: &str) -> Option<&InterceptorChains> {
        self.interceptors.get(controller)
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{handler, Outcome};

    fn target(action: &str) -> RouteTarget {
        RouteTarget::new("app::Users", action, handler(|_| Ok(Outcome::Continue)))
    }

    fn matched_action(registry: &RouteRegistry, path: &str) -> Option<String> {
        registry
            .match_request(HttpVerb::Get, path)
            .map(|m| m.route.target().action().to_string())
    }

    #[test]
    fn test_static_routes_win_in_either_order() {
        for dynamic_first in [true, false] {
            let mut registry = RouteRegistry::default();
            if dynamic_first {
                registry.register(HttpVerb::Get, "/user/:id", target("show")).unwrap();
                registry.register(HttpVerb::Get, "/user/new", target("new")).unwrap();
            } else {
                registry.register(HttpVerb::Get, "/user/new", target("new")).unwrap();
                registry.register(HttpVerb::Get, "/user/:id", target("show")).unwrap();
            }
            registry.normalize();

            assert_eq!(matched_action(&registry, "/user/new").as_deref(), Some("new"));
            assert_eq!(matched_action(&registry, "/user/123").as_deref(), Some("show"));
        }
    }

    #[test]
    fn test_registration_order_kept_within_group() {
        let mut registry = RouteRegistry::default();
        registry.register(HttpVerb::Get, "/a/:x", target("first")).unwrap();
        registry.register(HttpVerb::Get, "/static", target("static")).unwrap();
        registry.register(HttpVerb::Get, "/a/:y", target("second")).unwrap();
        registry.normalize();

        let actions: Vec<_> = registry
            .routes(HttpVerb::Get)
            .iter()
            .map(|r| r.target().action().to_string())
            .collect();
        assert_eq!(actions, ["static", "first", "second"]);
        assert_eq!(matched_action(&registry, "/a/1").as_deref(), Some("first"));
    }

    #[test]
    fn test_verbs_are_separate_buckets() {
        let mut registry = RouteRegistry::default();
        registry.register(HttpVerb::Post, "/users", target("create")).unwrap();
        registry.normalize();

        assert!(registry.match_request(HttpVerb::Get, "/users").is_none());
        assert!(registry.match_request(HttpVerb::Post, "/users").is_some());
    }

    #[test]
    fn test_duplicates_ignored_by_default() {
        let mut registry = RouteRegistry::default();
        assert!(registry.register(HttpVerb::Get, "/users", target("a")).unwrap());
        assert!(!registry.register(HttpVerb::Get, "/USERS", target("b")).unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicates_rejected_when_configured() {
        let mut registry = RouteRegistry::new(RegistryOptions {
            reject_duplicates: true,
            ..Default::default()
        });
        registry.register(HttpVerb::Get, "/users", target("a")).unwrap();
        let err = registry.register(HttpVerb::Get, "/users", target("b")).unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
    }

    #[test]
    fn test_sealed_after_normalize() {
        let mut registry = RouteRegistry::default();
        registry.normalize();
        registry.normalize();
        assert!(registry.is_normalized());
        assert!(matches!(
            registry.register(HttpVerb::Get, "/late", target("late")),
            Err(RouteError::Sealed { .. })
        ));
    }

    #[test]
    fn test_malformed_route_fails_registration() {
        let mut registry = RouteRegistry::default();
        assert!(registry.register(HttpVerb::Get, r"/bad/(\d+", target("bad")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_interceptor_chains_sorted_on_normalize() {
        let mut registry = RouteRegistry::default();
        for priority in [5, 1, 3] {
            let interceptor = Interceptor::before(format!("p{priority}"), |_| Ok(Outcome::Continue))
                .with_priority(priority);
            registry.add_interceptor("app::Users", interceptor).unwrap();
        }
        registry.normalize();

        let names: Vec<_> = registry
            .chains("app::Users")
            .unwrap()
            .before()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(names, ["p1", "p3", "p5"]);
    }
}
