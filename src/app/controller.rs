//! Controller discovery contract.
//!
//! A controller declares its routes and interceptors once, while the
//! application loads. Declarations are collected by a [`ControllerBuilder`]
//! and installed into a [`RouteRegistry`] in one step.

use std::sync::Arc;

use crate::dispatch::{handler, HandlerResult, Interceptor, InterceptorGroup};
use crate::dispatch::context::Exchange;
use crate::routing::{join_paths, HttpVerb, RouteRegistry, RouteResult, RouteTarget};

/// A group of related routes sharing an id, base paths and interceptors.
pub trait Controller: Send + Sync + 'static {
    /// Controller id used for interceptor scoping and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Prefixes applied to every route path. Empty means `/`.
    fn base_paths(&self) -> Vec<String> {
        Vec::new()
    }

    /// Declare routes and interceptors.
    fn configure(&self, routes: &mut ControllerBuilder);
}

struct RouteDecl {
    verbs: Vec<HttpVerb>,
    paths: Vec<String>,
    action: String,
    handler: crate::dispatch::Handler,
}

/// Collects one controller's declarations.
pub struct ControllerBuilder {
    controller: Arc<str>,
    base_paths: Vec<String>,
    routes: Vec<RouteDecl>,
    interceptors: Vec<Interceptor>,
}

impl ControllerBuilder {
    pub fn new(controller: impl Into<Arc<str>>, base_paths: Vec<String>) -> Self {
        Self {
            controller: controller.into(),
            base_paths,
            routes: Vec::new(),
            interceptors: Vec::new(),
        }
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Declare an action reachable through every `(verb, path)` pair.
    pub fn route<V, P, S, F>(&mut self, verbs: V, paths: P, action: &str, f: F) -> &mut Self
    where
        V: IntoIterator<Item = HttpVerb>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        self.routes.push(RouteDecl {
            verbs: verbs.into_iter().collect(),
            paths: paths.into_iter().map(Into::into).collect(),
            action: action.to_string(),
            handler: handler(f),
        });
        self
    }

    pub fn get<F>(&mut self, path: &str, action: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        self.route([HttpVerb::Get], [path], action, f)
    }

    pub fn post<F>(&mut self, path: &str, action: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        self.route([HttpVerb::Post], [path], action, f)
    }

    pub fn put<F>(&mut self, path: &str, action: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        self.route([HttpVerb::Put], [path], action, f)
    }

    pub fn delete<F>(&mut self, path: &str, action: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        self.route([HttpVerb::Delete], [path], action, f)
    }

    pub fn patch<F>(&mut self, path: &str, action: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        self.route([HttpVerb::Patch], [path], action, f)
    }

    pub fn head<F>(&mut self, path: &str, action: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        self.route([HttpVerb::Head], [path], action, f)
    }

    pub fn options<F>(&mut self, path: &str, action: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Exchange) -> HandlerResult + Send + Sync + 'static,
    {
        self.route([HttpVerb::Options], [path], action, f)
    }

    /// Attach an interceptor to this controller.
    pub fn interceptor(&mut self, interceptor: Interceptor) -> &mut Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Attach every interceptor of `group`, including nested groups.
    pub fn with(&mut self, group: &InterceptorGroup) -> &mut Self {
        tracing::debug!(controller = %self.controller, group = %group.name(), "Delegating to interceptor group");
        self.interceptors.extend(group.flatten());
        self
    }

    /// Every `(base, path)` combination for one declaration.
    fn expand_paths(&self, paths: &[String]) -> Vec<String> {
        let root = [String::from("/")];
        let bases: &[String] = if self.base_paths.is_empty() { &root } else { &self.base_paths };
        let paths: &[String] = if paths.is_empty() { &root } else { paths };

        bases
            .iter()
            .flat_map(move |base| paths.iter().map(move |path| join_paths(base, path)))
            .collect()
    }

    /// Register everything declared so far. Returns the number of routes added.
    pub fn install(self, registry: &mut RouteRegistry) -> RouteResult<usize> {
        let mut added = 0;

        for decl in &self.routes {
            let verbs: &[HttpVerb] = if decl.verbs.is_empty() { &HttpVerb::ALL } else { &decl.verbs };
            for path in self.expand_paths(&decl.paths) {
                for &verb in verbs {
                    let target = RouteTarget::new(
                        Arc::clone(&self.controller),
                        decl.action.as_str(),
                        Arc::clone(&decl.handler),
                    );
                    if registry.register(verb, &path, target)? {
                        added += 1;
                    }
                }
            }
        }

        for interceptor in self.interceptors {
            registry.add_interceptor(&self.controller, interceptor)?;
        }

        Ok(added)
    }
}
