//! Router core: ordered route list, dispatch and composition.
//!
//! # Dispatch
//!
//! Routes are tried in registration order and the first match wins. No route
//! outranks an earlier one for being more specific. While scanning, the router
//! remembers whether any route failed only on its method; if nothing matched,
//! that turns the outcome into [`MatchError::MethodMismatch`] (405) instead of
//! [`MatchError::NotFound`] (404).
//!
//! Serving a request through [`Handler::serve`] adds path cleaning, the
//! strict-slash redirect and the request context on top of
//! [`Router::match_request`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use http::{Method, StatusCode};
use tracing::{debug, warn};

use super::clean::clean_path;
use super::context::{set_context, AllowedMethods, Vars};
use super::matcher::Verdict;
use super::route::{Evaluation, Registry, Route, RouteId, Scope};
use super::view::{encode_path, RequestView};
use crate::error::{MatchError, RouteError};
use crate::handler::{self, Handler, Middleware, Request, Response};
use crate::pattern::{PatternCache, TemplateKind};
use crate::runtime_config::RouterConfig;

/// Matching longer than this is logged as slow.
const SLOW_MATCH: Duration = Duration::from_millis(1);

/// Outcome of one dispatch attempt.
///
/// On success `error` is `None` and `route` is the matched route. On failure
/// `error` holds the classification and `handler` is the fallback handler of
/// the router that produced it, if one was configured.
pub struct RouteMatch<'r> {
    pub route: Option<&'r Route>,
    pub handler: Option<Arc<dyn Handler>>,
    pub vars: Vars,
    pub error: Option<MatchError>,
}

impl<'r> RouteMatch<'r> {
    fn failed(error: MatchError, handler: Option<Arc<dyn Handler>>) -> Self {
        Self {
            route: None,
            handler,
            vars: Vars::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_match(&self) -> bool {
        self.error.is_none()
    }

    /// A match, or a failure that a router answered with its own handler.
    pub(crate) fn is_final(&self) -> bool {
        self.error.is_none() || self.handler.is_some()
    }
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route.map(Route::id))
            .field("has_handler", &self.handler.is_some())
            .field("vars", &self.vars)
            .field("error", &self.error)
            .finish()
    }
}

/// An ordered collection of routes.
pub struct Router {
    routes: Vec<Route>,
    scope: Scope,
    registry: Registry,
    cache: PatternCache,
    middlewares: Vec<Arc<dyn Middleware>>,
    wrapped: DashMap<RouteId, Arc<dyn Handler>>,
    not_found: Option<Arc<dyn Handler>>,
    method_not_allowed: Option<Arc<dyn Handler>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a root router with an empty name registry and its own pattern cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache(PatternCache::new())
    }

    /// Create a root router whose routes compile through `cache`.
    #[must_use]
    pub fn with_cache(cache: PatternCache) -> Self {
        Self::child(Scope::default(), Arc::new(DashMap::new()), cache)
    }

    /// Create a root router from runtime configuration.
    #[must_use]
    pub fn with_config(config: &RouterConfig) -> Self {
        let cache = if config.pattern_cache {
            PatternCache::new()
        } else {
            PatternCache::disabled()
        };
        let mut router = Self::with_cache(cache);
        router
            .strict_slash(config.strict_slash)
            .skip_clean(config.skip_clean)
            .use_encoded_path(config.use_encoded_path);
        router
    }

    pub(crate) fn child(scope: Scope, registry: Registry, cache: PatternCache) -> Self {
        Self {
            routes: Vec::new(),
            scope,
            registry,
            cache,
            middlewares: Vec::new(),
            wrapped: DashMap::new(),
            not_found: None,
            method_not_allowed: None,
        }
    }

    // ---------------------------------------------------------------------
    // Flags and hooks
    // ---------------------------------------------------------------------

    /// Redirect `/path` to `/path/` (and back) when the route template says so.
    /// Applies to routes created afterwards.
    pub fn strict_slash(&mut self, value: bool) -> &mut Self {
        self.scope.strict_slash = value;
        self
    }

    /// Match the path as sent, without cleaning `.`/`..` and duplicate slashes.
    /// Applies to routes created afterwards.
    pub fn skip_clean(&mut self, value: bool) -> &mut Self {
        self.scope.skip_clean = value;
        self
    }

    /// Match path templates against the percent-encoded path.
    /// Applies to routes created afterwards.
    pub fn use_encoded_path(&mut self, value: bool) -> &mut Self {
        self.scope.use_encoded_path = value;
        self
    }

    pub fn not_found_handler<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    pub fn method_not_allowed_handler<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method_not_allowed = Some(Arc::new(handler));
        self
    }

    /// Append a middleware. Middlewares run only for matched routes, the
    /// first registered outermost.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self.wrapped.clear();
        self
    }

    // ---------------------------------------------------------------------
    // Route factories
    // ---------------------------------------------------------------------

    /// Register an empty route. It matches every request until constrained.
    pub fn new_route(&mut self) -> &mut Route {
        let idx = self.routes.len();
        self.routes.push(Route::new(
            self.scope.clone(),
            Arc::clone(&self.registry),
            self.cache.clone(),
        ));
        &mut self.routes[idx]
    }

    pub fn handle<H: Handler + 'static>(&mut self, path: &str, handler: H) -> &mut Route {
        self.new_route().path(path).handler(handler)
    }

    pub fn handle_fn<F>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
    {
        self.new_route().path(path).handler_fn(f)
    }

    pub fn host(&mut self, template: &str) -> &mut Route {
        self.new_route().host(template)
    }

    pub fn path(&mut self, template: &str) -> &mut Route {
        self.new_route().path(template)
    }

    pub fn path_prefix(&mut self, template: &str) -> &mut Route {
        self.new_route().path_prefix(template)
    }

    pub fn methods<I, S>(&mut self, methods: I) -> &mut Route
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.new_route().methods(methods)
    }

    pub fn headers<I, K, V>(&mut self, pairs: I) -> &mut Route
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.new_route().headers(pairs)
    }

    pub fn headers_regexp<I, K, V>(&mut self, pairs: I) -> &mut Route
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.new_route().headers_regexp(pairs)
    }

    pub fn queries<I, K, V>(&mut self, pairs: I) -> &mut Route
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.new_route().queries(pairs)
    }

    pub fn schemes<I, S>(&mut self, schemes: I) -> &mut Route
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.new_route().schemes(schemes)
    }

    pub fn matcher_fn<F, V>(&mut self, f: F) -> &mut Route
    where
        F: Fn(&Request) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        self.new_route().matcher_fn(f)
    }

    pub fn build_vars_fn<F>(&mut self, f: F) -> &mut Route
    where
        F: Fn(Vars) -> Vars + Send + Sync + 'static,
    {
        self.new_route().build_vars_fn(f)
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    /// Routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find a named route in this router or any of its subrouters.
    #[must_use]
    pub fn named_route(&self, name: &str) -> Option<&Route> {
        let id = *self.registry.get(name)?;
        self.find_route(id)
    }

    fn find_route(&self, id: RouteId) -> Option<&Route> {
        self.routes.iter().find_map(|route| {
            if route.id() == id {
                Some(route)
            } else {
                route.get_subrouter().and_then(|sub| sub.find_route(id))
            }
        })
    }

    /// The first configuration error in the tree, in walk order.
    #[must_use]
    pub fn first_error(&self) -> Option<&RouteError> {
        self.routes.iter().find_map(|route| {
            route
                .get_error()
                .or_else(|| route.get_subrouter().and_then(Router::first_error))
        })
    }

    #[must_use]
    pub fn pattern_cache(&self) -> &PatternCache {
        &self.cache
    }

    // ---------------------------------------------------------------------
    // Matching
    // ---------------------------------------------------------------------

    /// Classify `req` against the route tree without invoking any handler.
    ///
    /// Path cleaning and strict-slash redirects are not applied here; see
    /// [`Handler::serve`].
    #[must_use]
    pub fn match_request(&self, req: &Request) -> RouteMatch<'_> {
        let view = RequestView::new(req);
        self.resolve(&view)
    }

    pub(crate) fn resolve(&self, view: &RequestView<'_>) -> RouteMatch<'_> {
        let mut method_mismatch = false;
        for route in self.routes.iter().filter(|r| !r.is_build_only()) {
            match route.evaluate(view) {
                Evaluation::Resolved(mut found) => {
                    if found.error.is_none() {
                        if let (Some(matched), Some(inner)) = (found.route, found.handler.take()) {
                            found.handler = Some(self.wrap(matched.id(), inner));
                        }
                    }
                    return found;
                }
                Evaluation::MethodMismatch => method_mismatch = true,
                Evaluation::NoMatch => {}
            }
        }

        if method_mismatch {
            RouteMatch::failed(MatchError::MethodMismatch, self.method_not_allowed.clone())
        } else {
            RouteMatch::failed(MatchError::NotFound, self.not_found.clone())
        }
    }

    /// Apply this router's middleware chain, memoised per route.
    fn wrap(&self, id: RouteId, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        if self.middlewares.is_empty() {
            return inner;
        }
        let entry = self.wrapped.entry(id).or_insert_with(|| {
            self.middlewares
                .iter()
                .rev()
                .fold(inner, |next, mw| mw.wrap(next))
        });
        Arc::clone(entry.value())
    }

    /// Methods of every route whose other constraints accept `req`, in
    /// registration order without duplicates.
    #[must_use]
    pub fn allowed_methods(&self, req: &Request) -> Vec<Method> {
        let view = RequestView::new(req);
        let mut out = Vec::new();
        self.collect_allowed(&view, &mut out);
        out
    }

    /// Returns true when a matching route accepts any method.
    pub(crate) fn collect_allowed(&self, view: &RequestView<'_>, out: &mut Vec<Method>) -> bool {
        let mut any_method = false;
        for route in &self.routes {
            any_method |= route.collect_allowed(view, out);
        }
        any_method
    }

    /// Location to redirect to when cleaning changes the request path.
    fn clean_redirect(&self, req: &Request) -> Option<String> {
        if self.scope.skip_clean {
            return None;
        }
        let raw = req.uri().path();
        // Authority-form (CONNECT) and asterisk-form targets have no path to clean.
        if raw.is_empty() || raw == "*" || req.method() == Method::CONNECT {
            return None;
        }
        let location = if self.scope.use_encoded_path {
            let cleaned = clean_path(raw);
            (cleaned != raw).then_some(cleaned)?
        } else {
            let decoded = super::view::decode_path(raw);
            let cleaned = clean_path(&decoded);
            (cleaned != decoded).then(|| encode_path(&cleaned))?
        };
        Some(with_query(location, req))
    }

    /// Location to redirect to when the trailing slash disagrees with the
    /// matched path template.
    fn strict_slash_redirect(route: &Route, req: &Request) -> Option<String> {
        if !route.strict_slash() {
            return None;
        }
        let template = route.path_template()?;
        if template.kind() != TemplateKind::Path {
            return None;
        }
        let path = req.uri().path();
        let wants_slash = template.has_trailing_slash();
        if wants_slash == path.ends_with('/') {
            return None;
        }
        let location = if wants_slash {
            format!("{path}/")
        } else {
            path.trim_end_matches('/').to_string()
        };
        if location.is_empty() {
            return None;
        }
        Some(with_query(location, req))
    }
}

impl Handler for Router {
    fn serve(&self, req: &mut Request, res: &mut Response) {
        debug!(
            method = %req.method(),
            uri = %req.uri(),
            "Route match attempt"
        );

        if let Some(location) = self.clean_redirect(req) {
            debug!(location = %location, "Redirecting to cleaned path");
            handler::redirect(res, &location, StatusCode::PERMANENT_REDIRECT);
            return;
        }

        let match_start = Instant::now();
        let found = self.match_request(req);
        let match_duration = match_start.elapsed();
        if match_duration > SLOW_MATCH {
            warn!(
                method = %req.method(),
                path = %req.uri().path(),
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        }

        match found.error {
            None => {
                let Some(route) = found.route else {
                    handler::not_found(req, res);
                    return;
                };
                if let Some(location) = Self::strict_slash_redirect(route, req) {
                    debug!(route_id = %route.id(), location = %location, "Strict slash redirect");
                    handler::redirect(res, &location, StatusCode::PERMANENT_REDIRECT);
                    return;
                }
                debug!(
                    route_id = %route.id(),
                    route_name = ?route.get_name(),
                    vars = ?found.vars,
                    duration_us = match_duration.as_micros(),
                    "Route matched"
                );
                set_context(req, route.info(), found.vars);
                match &found.handler {
                    Some(h) => h.serve(req, res),
                    None => handler::not_found(req, res),
                }
            }
            Some(MatchError::MethodMismatch) => {
                let allowed = self.allowed_methods(req);
                debug!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    allowed = ?allowed,
                    "Method not allowed"
                );
                req.extensions_mut().insert(AllowedMethods(allowed));
                match &found.handler {
                    Some(h) => h.serve(req, res),
                    None => handler::method_not_allowed(req, res),
                }
            }
            Some(MatchError::NotFound) => {
                debug!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    "No route matched"
                );
                match &found.handler {
                    Some(h) => h.serve(req, res),
                    None => handler::not_found(req, res),
                }
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("strict_slash", &self.scope.strict_slash)
            .field("skip_clean", &self.scope.skip_clean)
            .field("use_encoded_path", &self.scope.use_encoded_path)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

fn with_query(mut location: String, req: &Request) -> String {
    if let Some(query) = req.uri().query() {
        location.push('?');
        location.push_str(query);
    }
    location
}
