//! A single routing rule.
//!
//! Routes are configured through chained `&mut Self` calls:
//!
//! ```rust
//! use routemux::Router;
//!
//! let mut router = Router::new();
//! router
//!     .new_route()
//!     .path("/users/{id:int}")
//!     .methods(["GET", "HEAD"])
//!     .name("user")
//!     .handler_fn(|_req, _res| {});
//! assert!(router.named_route("user").unwrap().get_error().is_none());
//! ```
//!
//! The first configuration error is kept on the route and every later
//! configuration call becomes a no-op. A route carrying an error never matches
//! and refuses to build URLs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use http::header::HeaderName;
use http::Method;
use smallvec::SmallVec;
use tracing::warn;

use super::context::{RouteInfo, Vars};
use super::core::{RouteMatch, Router};
use super::matcher::{Matcher, Verdict};
use super::view::RequestView;
use crate::error::{MatchError, RouteError};
use crate::handler::{Handler, Request, Response};
use crate::pattern::{CompiledTemplate, PatternCache, TemplateKind, TemplateOptions};

static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u64);

impl RouteId {
    fn next() -> Self {
        RouteId(NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route#{}", self.0)
    }
}

/// Transforms the variable map before matching results are returned and
/// before URLs are built.
pub type BuildVarsFn = Arc<dyn Fn(Vars) -> Vars + Send + Sync>;

/// Route names shared by every router in one tree.
pub(crate) type Registry = Arc<DashMap<String, RouteId>>;

/// What a router hands down to the routes it creates. Copied at creation
/// time; later changes to the router do not reach existing routes.
#[derive(Clone, Default)]
pub(crate) struct Scope {
    pub(crate) strict_slash: bool,
    pub(crate) skip_clean: bool,
    pub(crate) use_encoded_path: bool,
    pub(crate) host: Option<CompiledTemplate>,
    pub(crate) path: Option<CompiledTemplate>,
    pub(crate) queries: Vec<CompiledTemplate>,
    pub(crate) build_scheme: Option<String>,
    /// Ancestor transforms, nearest ancestor first.
    pub(crate) build_vars: Vec<BuildVarsFn>,
}

impl Scope {
    fn template_options(&self) -> TemplateOptions {
        TemplateOptions {
            strict_slash: self.strict_slash,
            use_encoded_path: self.use_encoded_path,
        }
    }
}

/// Result of evaluating one route against a request.
pub(crate) enum Evaluation<'r> {
    /// Matched, or a subrouter produced a final answer (including its own
    /// not-found / method-not-allowed handler).
    Resolved(RouteMatch<'r>),
    MethodMismatch,
    NoMatch,
}

pub struct Route {
    id: RouteId,
    scope: Scope,
    matchers: SmallVec<[Matcher; 4]>,
    host: Option<CompiledTemplate>,
    path: Option<CompiledTemplate>,
    queries: Vec<CompiledTemplate>,
    handler: Option<Arc<dyn Handler>>,
    subrouter: Option<Box<Router>>,
    name: Option<String>,
    err: Option<RouteError>,
    build_only: bool,
    build_scheme: Option<String>,
    build_vars: Vec<BuildVarsFn>,
    registry: Registry,
    cache: PatternCache,
}

impl Route {
    pub(crate) fn new(scope: Scope, registry: Registry, cache: PatternCache) -> Self {
        Self {
            id: RouteId::next(),
            host: scope.host.clone(),
            path: scope.path.clone(),
            queries: scope.queries.clone(),
            build_scheme: scope.build_scheme.clone(),
            scope,
            matchers: SmallVec::new(),
            handler: None,
            subrouter: None,
            name: None,
            err: None,
            build_only: false,
            build_vars: Vec::new(),
            registry,
            cache,
        }
    }

    /// Apply one configuration step unless an error is already recorded.
    fn configure<F>(&mut self, step: F) -> &mut Self
    where
        F: FnOnce(&mut Self) -> Result<(), RouteError>,
    {
        if self.err.is_none() {
            if let Err(err) = step(self) {
                warn!(route_id = %self.id, error = %err, "Route configuration failed");
                self.err = Some(err);
            }
        }
        self
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    pub fn handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.handler_arc(Arc::new(handler))
    }

    pub fn handler_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
    {
        self.handler_arc(Arc::new(f))
    }

    pub fn handler_arc(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.configure(|route| {
            route.handler = Some(handler);
            Ok(())
        })
    }

    /// Register the route under `name` in the tree-wide registry.
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.configure(|route| {
            if let Some(existing) = &route.name {
                return Err(RouteError::RouteAlreadyNamed {
                    existing: existing.clone(),
                    requested: name.to_string(),
                });
            }
            match route.registry.entry(name.to_string()) {
                Entry::Occupied(_) => {
                    return Err(RouteError::DuplicateRouteName {
                        name: name.to_string(),
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(route.id);
                }
            }
            route.name = Some(name.to_string());
            Ok(())
        })
    }

    /// Match the request host. Inside a subrouter created from a route with a
    /// host, the template is prepended as a more specific label:
    /// `api` under `example.com` becomes `api.example.com`.
    pub fn host(&mut self, template: &str) -> &mut Self {
        self.configure(|route| {
            let full = match &route.scope.host {
                Some(parent) => format!("{template}.{}", parent.template()),
                None => template.to_string(),
            };
            let compiled = route.compile(&full, TemplateKind::Host)?;
            route.host = Some(compiled);
            route.check_duplicate_vars()
        })
    }

    /// Match the full request path.
    pub fn path(&mut self, template: &str) -> &mut Self {
        self.configure(|route| route.set_path(template, TemplateKind::Path))
    }

    /// Match the leading part of the request path. Useful with [`subrouter`](Self::subrouter).
    pub fn path_prefix(&mut self, template: &str) -> &mut Self {
        self.configure(|route| route.set_path(template, TemplateKind::Prefix))
    }

    /// Accept only the given methods (case-insensitive).
    pub fn methods<I, S>(&mut self, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.configure(|route| {
            let parsed = methods
                .into_iter()
                .map(|m| {
                    let upper = m.as_ref().to_ascii_uppercase();
                    Method::from_bytes(upper.as_bytes())
                        .map_err(|_| RouteError::InvalidMethod { method: upper })
                })
                .collect::<Result<Vec<_>, _>>()?;
            route.matchers.push(Matcher::Methods(parsed));
            Ok(())
        })
    }

    /// Require headers. An empty value only requires presence.
    pub fn headers<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.configure(|route| {
            let parsed = pairs
                .into_iter()
                .map(|(k, v)| -> Result<_, RouteError> {
                    Ok((header_name(k.as_ref())?, v.as_ref().to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            route.matchers.push(Matcher::Headers(parsed));
            Ok(())
        })
    }

    /// Require headers whose value matches a regular expression. An empty
    /// pattern only requires presence.
    pub fn headers_regexp<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.configure(|route| {
            let mut parsed = Vec::new();
            for (k, v) in pairs {
                let name = header_name(k.as_ref())?;
                let pattern = v.as_ref();
                let regex = if pattern.is_empty() {
                    None
                } else {
                    Some(route.cache.get_or_compile(pattern).map_err(|err| {
                        RouteError::InvalidPattern {
                            pattern: pattern.to_string(),
                            reason: err.to_string(),
                        }
                    })?)
                };
                parsed.push((name, regex));
            }
            route.matchers.push(Matcher::HeadersRegex(parsed));
            Ok(())
        })
    }

    /// Require query parameters. Values are templates (`{page:int}`); an
    /// empty value only requires the key to be present.
    pub fn queries<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.configure(|route| {
            for (k, v) in pairs {
                let (key, value) = (k.as_ref(), v.as_ref());
                let template = if value.is_empty() {
                    key.to_string()
                } else {
                    format!("{key}={value}")
                };
                let compiled = route.compile(&template, TemplateKind::Query)?;
                route.queries.push(compiled);
            }
            route.check_duplicate_vars()
        })
    }

    /// Accept only the given URL schemes. The first one becomes the scheme of
    /// built URLs, replacing any inherited from a mount point.
    pub fn schemes<I, S>(&mut self, schemes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.configure(|route| {
            let schemes: Vec<String> = schemes
                .into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .collect();
            if route.build_scheme.is_none() || route.build_scheme == route.scope.build_scheme {
                if let Some(first) = schemes.first() {
                    route.build_scheme = Some(first.clone());
                }
            }
            route.matchers.push(Matcher::Schemes(schemes));
            Ok(())
        })
    }

    /// Add a custom predicate. It may return a `bool` or a [`Verdict`];
    /// returning [`Verdict::MethodMismatch`] takes part in 405 classification.
    pub fn matcher_fn<F, V>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Request) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        self.configure(|route| {
            route
                .matchers
                .push(Matcher::Custom(Arc::new(move |req: &Request| -> Verdict {
                    f(req).into()
                })));
            Ok(())
        })
    }

    /// Exclude the route from matching; it stays available for URL building.
    pub fn build_only(&mut self) -> &mut Self {
        self.configure(|route| {
            route.build_only = true;
            Ok(())
        })
    }

    /// Add a variable transform. Transforms run in registration order, then
    /// the ancestors' transforms from the nearest ancestor outward.
    pub fn build_vars_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Vars) -> Vars + Send + Sync + 'static,
    {
        self.configure(|route| {
            route.build_vars.push(Arc::new(f));
            Ok(())
        })
    }

    /// Turn this route into a mount point for a nested router.
    ///
    /// Routes created on the subrouter inherit this route's host, path and
    /// query templates, build scheme, variable transforms and the owning
    /// router's flags. Calling it again returns the same subrouter.
    pub fn subrouter(&mut self) -> &mut Router {
        let Route {
            scope,
            host,
            path,
            queries,
            subrouter,
            build_scheme,
            build_vars,
            registry,
            cache,
            ..
        } = self;
        subrouter.get_or_insert_with(|| {
            let mut inherited = build_vars.clone();
            inherited.extend(scope.build_vars.iter().cloned());
            let child_scope = Scope {
                strict_slash: scope.strict_slash,
                skip_clean: scope.skip_clean,
                use_encoded_path: scope.use_encoded_path,
                host: host.clone(),
                path: path.clone(),
                queries: queries.clone(),
                build_scheme: build_scheme.clone(),
                build_vars: inherited,
            };
            Box::new(Router::child(child_scope, Arc::clone(registry), cache.clone()))
        })
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// The first configuration error, if any.
    #[must_use]
    pub fn get_error(&self) -> Option<&RouteError> {
        self.err.as_ref()
    }

    #[must_use]
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn get_handler(&self) -> Option<&Arc<dyn Handler>> {
        self.handler.as_ref()
    }

    /// The nested router, when this route is a mount point.
    #[must_use]
    pub fn get_subrouter(&self) -> Option<&Router> {
        self.subrouter.as_deref()
    }

    #[must_use]
    pub fn get_host_template(&self) -> Option<&str> {
        self.host.as_ref().map(CompiledTemplate::template)
    }

    #[must_use]
    pub fn get_path_template(&self) -> Option<&str> {
        self.path.as_ref().map(CompiledTemplate::template)
    }

    #[must_use]
    pub fn get_path_regexp(&self) -> Option<&str> {
        self.path.as_ref().map(CompiledTemplate::regex_str)
    }

    #[must_use]
    pub fn get_queries_templates(&self) -> Vec<&str> {
        self.queries.iter().map(CompiledTemplate::template).collect()
    }

    #[must_use]
    pub fn get_queries_regexp(&self) -> Vec<&str> {
        self.queries.iter().map(CompiledTemplate::regex_str).collect()
    }

    /// Union of all method matchers on this route, in configuration order.
    #[must_use]
    pub fn get_methods(&self) -> Option<Vec<Method>> {
        let mut methods: Vec<Method> = Vec::new();
        let mut found = false;
        for list in self.matchers.iter().filter_map(Matcher::methods) {
            found = true;
            for m in list {
                if !methods.contains(m) {
                    methods.push(m.clone());
                }
            }
        }
        found.then_some(methods)
    }

    #[must_use]
    pub fn is_build_only(&self) -> bool {
        self.build_only
    }

    #[must_use]
    pub fn host_template(&self) -> Option<&CompiledTemplate> {
        self.host.as_ref()
    }

    #[must_use]
    pub fn path_template(&self) -> Option<&CompiledTemplate> {
        self.path.as_ref()
    }

    #[must_use]
    pub fn query_templates(&self) -> &[CompiledTemplate] {
        &self.queries
    }

    /// A snapshot suitable for attaching to a request.
    #[must_use]
    pub fn info(&self) -> RouteInfo {
        RouteInfo {
            id: self.id,
            name: self.name.clone(),
            host_template: self.get_host_template().map(str::to_string),
            path_template: self.get_path_template().map(str::to_string),
            methods: self.get_methods().unwrap_or_default(),
        }
    }

    pub(crate) fn build_scheme(&self) -> Option<&str> {
        self.build_scheme.as_deref()
    }

    pub(crate) fn strict_slash(&self) -> bool {
        self.scope.strict_slash
    }

    pub(crate) fn use_encoded_path(&self) -> bool {
        self.scope.use_encoded_path
    }

    // ---------------------------------------------------------------------
    // Matching
    // ---------------------------------------------------------------------

    /// Evaluate matchers and templates.
    ///
    /// Returns `None` on a plain miss. Otherwise returns whether a method
    /// mismatch was seen along with the extracted variables. A method mismatch
    /// does not stop evaluation: a later host/path/query miss still wins, so a
    /// request that fails on both counts is a 404, not a 405. Once observed,
    /// the mismatch stays set for this evaluation regardless of which matcher
    /// (method list or custom predicate) reported it.
    fn check(&self, view: &RequestView<'_>) -> Option<(bool, Vars)> {
        if self.err.is_some() {
            return None;
        }

        let mut method_mismatch = false;
        for matcher in &self.matchers {
            match matcher.evaluate(view.req) {
                Verdict::Match => {}
                Verdict::MethodMismatch => method_mismatch = true,
                Verdict::NoMatch => return None,
            }
        }

        let mut vars = Vars::new();
        // A mount point's routes carry the same host template or one extended
        // with more specific labels, so the mount matches it as a suffix.
        if let Some(host) = &self.host {
            let host_value = view.host_for(host);
            let captured = if self.subrouter.is_some() {
                host.captures_suffix(host_value)?
            } else {
                host.captures(host_value)?
            };
            for (name, value) in captured {
                vars.insert(name.to_string(), value);
            }
        }
        if let Some(path) = &self.path {
            for (name, value) in path.captures(view.path(self.scope.use_encoded_path))? {
                vars.insert(name.to_string(), value);
            }
        }
        for query in &self.queries {
            let value = view.query_value(query.query_key().unwrap_or_default())?;
            for (name, value) in query.captures(value)? {
                vars.insert(name.to_string(), value);
            }
        }
        Some((method_mismatch, vars))
    }

    pub(crate) fn evaluate(&self, view: &RequestView<'_>) -> Evaluation<'_> {
        let Some((method_mismatch, vars)) = self.check(view) else {
            return Evaluation::NoMatch;
        };
        if method_mismatch {
            return Evaluation::MethodMismatch;
        }

        if let Some(router) = &self.subrouter {
            let nested = router.resolve(view);
            return if nested.is_final() {
                Evaluation::Resolved(nested)
            } else if nested.error == Some(MatchError::MethodMismatch) {
                Evaluation::MethodMismatch
            } else {
                Evaluation::NoMatch
            };
        }

        Evaluation::Resolved(RouteMatch {
            route: Some(self),
            handler: self.handler.clone(),
            vars: self.transform_vars(vars),
            error: None,
        })
    }

    /// Collect methods of routes whose non-method constraints accept the request.
    ///
    /// Returns true when such a route has no method matcher at all. A mount
    /// point with methods limits what its subrouter contributes to those
    /// methods.
    pub(crate) fn collect_allowed(&self, view: &RequestView<'_>, out: &mut Vec<Method>) -> bool {
        if self.build_only || self.check(view).is_none() {
            return false;
        }
        let own = self.get_methods();
        let Some(router) = &self.subrouter else {
            match own {
                Some(methods) => push_unique(out, methods),
                None => return true,
            }
            return false;
        };

        let mut nested = Vec::new();
        let any_method = router.collect_allowed(view, &mut nested);
        match own {
            None => {
                push_unique(out, nested);
                any_method
            }
            Some(own) => {
                let allowed = if any_method {
                    own
                } else {
                    own.into_iter().filter(|m| nested.contains(m)).collect()
                };
                push_unique(out, allowed);
                false
            }
        }
    }

    /// Own transforms first, then ancestors nearest-first.
    pub(crate) fn transform_vars(&self, vars: Vars) -> Vars {
        self.build_vars
            .iter()
            .chain(&self.scope.build_vars)
            .fold(vars, |acc, f| f(acc))
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn compile(&self, template: &str, kind: TemplateKind) -> Result<CompiledTemplate, RouteError> {
        CompiledTemplate::compile(template, kind, self.scope.template_options(), &self.cache)
    }

    fn set_path(&mut self, template: &str, kind: TemplateKind) -> Result<(), RouteError> {
        if !template.is_empty() && !template.starts_with('/') {
            return Err(RouteError::PathMustStartWithSlash {
                template: template.to_string(),
            });
        }
        let full = match &self.scope.path {
            Some(parent) => format!("{}{template}", parent.template().trim_end_matches('/')),
            None => template.to_string(),
        };
        let compiled = self.compile(&full, kind)?;
        self.path = Some(compiled);
        self.check_duplicate_vars()
    }

    /// Host, path and query variables share one namespace in the match result.
    fn check_duplicate_vars(&self) -> Result<(), RouteError> {
        let mut seen: Vec<&str> = Vec::new();
        let templates = self
            .host
            .iter()
            .chain(self.path.iter())
            .chain(self.queries.iter());
        for template in templates {
            for name in template.var_names() {
                if seen.contains(&name.as_str()) {
                    return Err(RouteError::DuplicateVariable { name: name.clone() });
                }
                seen.push(name);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.get_host_template())
            .field("path", &self.get_path_template())
            .field("queries", &self.get_queries_templates())
            .field("matchers", &self.matchers)
            .field("build_only", &self.build_only)
            .field("has_handler", &self.handler.is_some())
            .field("has_subrouter", &self.subrouter.is_some())
            .field("err", &self.err)
            .finish()
    }
}

fn push_unique(out: &mut Vec<Method>, methods: Vec<Method>) {
    for method in methods {
        if !out.contains(&method) {
            out.push(method);
        }
    }
}

fn header_name(name: &str) -> Result<HeaderName, RouteError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| RouteError::InvalidHeader {
        name: name.to_string(),
    })
}
