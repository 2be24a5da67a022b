//! Request-scoped routing state.
//!
//! After a successful dispatch the router stores a [`RouteContext`] in the
//! request's extensions. Handlers read it back through [`vars`], [`var`] and
//! [`current_route`]. Tests can inject a context directly with
//! [`set_url_vars`] to exercise a handler in isolation.

use std::collections::HashMap;

use http::Method;

use super::route::RouteId;

/// Variables extracted from host, path and query templates.
pub type Vars = HashMap<String, String>;

/// A snapshot of the route that matched a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub id: RouteId,
    pub name: Option<String>,
    pub host_template: Option<String>,
    pub path_template: Option<String>,
    pub methods: Vec<Method>,
}

/// The single routing slot attached to a dispatched request.
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    pub route: Option<RouteInfo>,
    pub vars: Vars,
}

/// Transport facts the router cannot read from the request line.
///
/// Inserted by the server layer; used to infer `https` when the request URI
/// carries no scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub tls: bool,
}

/// Methods accepted for the request's path, attached before the
/// method-not-allowed handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedMethods(pub Vec<Method>);

/// All route variables of the request, if it was dispatched by a router.
#[must_use]
pub fn vars<B>(req: &http::Request<B>) -> Option<&Vars> {
    req.extensions().get::<RouteContext>().map(|ctx| &ctx.vars)
}

/// A single route variable.
#[must_use]
pub fn var<'a, B>(req: &'a http::Request<B>, name: &str) -> Option<&'a str> {
    vars(req).and_then(|v| v.get(name)).map(String::as_str)
}

/// The route that matched the request.
#[must_use]
pub fn current_route<B>(req: &http::Request<B>) -> Option<&RouteInfo> {
    req.extensions()
        .get::<RouteContext>()
        .and_then(|ctx| ctx.route.as_ref())
}

/// Replace the request's route variables, keeping any matched route.
pub fn set_url_vars<B>(req: &mut http::Request<B>, vars: Vars) {
    match req.extensions_mut().get_mut::<RouteContext>() {
        Some(ctx) => ctx.vars = vars,
        None => {
            req.extensions_mut().insert(RouteContext { route: None, vars });
        }
    }
}

pub(crate) fn set_context<B>(req: &mut http::Request<B>, route: RouteInfo, vars: Vars) {
    req.extensions_mut().insert(RouteContext {
        route: Some(route),
        vars,
    });
}
