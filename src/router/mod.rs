//! # Router Module
//!
//! Matches requests against an ordered list of routes and dispatches them to
//! handlers. Routes combine matchers (method, header, scheme, custom) with
//! compiled host, path and query templates, and may nest further routers.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Registering routes in priority order
//! - Classifying each request as matched, method-not-allowed or not-found
//! - Extracting host, path and query variables into the request context
//! - Composing subrouters that inherit prefixes, hosts and flags
//! - Building URLs back from named routes
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use routemux::{var, Handler, Router};
//!
//! let mut router = Router::new();
//! let api = router.path_prefix("/api/v1").subrouter();
//! api.path("/users/{id:int}")
//!     .methods(["GET"])
//!     .handler_fn(|req, res| {
//!         let id = var(req, "id").unwrap_or_default().to_string();
//!         *res.body_mut() = Bytes::from(id);
//!     });
//!
//! let mut req = http::Request::builder()
//!     .uri("/api/v1/users/42")
//!     .body(Bytes::new())
//!     .unwrap();
//! let mut res = http::Response::new(Bytes::new());
//! router.serve(&mut req, &mut res);
//! assert_eq!(res.body(), "42");
//! ```
//!
//! ## Performance
//!
//! Matching is a linear scan over compiled regexes. Regexes are shared through
//! the tree's pattern cache and request parts are parsed once per dispatch.

mod clean;
mod context;
mod core;
mod matcher;
mod route;
mod url;
mod view;
mod walk;

pub use self::clean::clean_path;
pub use self::context::{
    current_route, set_url_vars, var, vars, AllowedMethods, ConnectionInfo, RouteContext,
    RouteInfo, Vars,
};
pub use self::core::{RouteMatch, Router};
pub use self::matcher::{MatchFn, Matcher, Verdict};
pub use self::route::{BuildVarsFn, Route, RouteId};
pub use self::url::BuiltUrl;
pub use self::walk::Walk;
