//! # routemux
//!
//! **routemux** is a declarative HTTP request router: routes combine host, path
//! and query templates with method, header and scheme matchers, nest into
//! subrouters, and run backwards to build URLs.
//!
//! ## Overview
//!
//! Templates such as `/users/{id:int}` or `{tenant}.example.com` compile once,
//! at configuration time, into anchored regular expressions plus the metadata
//! needed to reverse them. Requests are matched against routes in registration
//! order; the first match wins and its variables are attached to the request.
//! Requests that fail only on method are classified as "method not allowed"
//! rather than "not found".
//!
//! ## Architecture
//!
//! - **[`pattern`]** - Template compiler, macro table (`uuid`, `int`, `slug`, ...) and pattern cache
//! - **[`router`]** - Matchers, routes, router dispatch, subrouters, URL building, tree walk
//! - **[`handler`]** - Handler and middleware capabilities, default 404/405 responses
//! - **[`error`]** - Configuration and build errors, match outcome sentinels
//! - **[`runtime_config`]** - Environment-driven router flags
//! - **[`table`]** - Declarative YAML/JSON route tables
//! - **[`cli`]** - The `routemux` inspection tool
//!
//! ### Request Handling Flow
//!
//! ```text
//! request ─▶ clean path ─▶ scan routes in order ─┬─ matched ──▶ strict-slash check ─▶ middleware ─▶ handler
//!              │ (308 if changed)                 ├─ method mismatch seen ─▶ 405 (Allow: ...)
//!              ▼                                  └─ nothing ─▶ 404
//!          redirect
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use bytes::Bytes;
//! use routemux::{var, Handler, Router};
//!
//! let mut router = Router::new();
//! router
//!     .handle_fn("/articles/{category}/{id:int}", |req, res| {
//!         let body = format!("{}#{}", var(req, "category").unwrap_or(""), var(req, "id").unwrap_or(""));
//!         *res.body_mut() = Bytes::from(body);
//!     })
//!     .methods(["GET"])
//!     .name("article");
//!
//! // Dispatch
//! let mut req = http::Request::builder()
//!     .uri("/articles/rust/42")
//!     .body(Bytes::new())
//!     .unwrap();
//! let mut res = http::Response::new(Bytes::new());
//! router.serve(&mut req, &mut res);
//! assert_eq!(res.body(), "rust#42");
//!
//! // Reverse
//! let url = router
//!     .named_route("article")
//!     .unwrap()
//!     .url([("category", "go"), ("id", "7")])
//!     .unwrap();
//! assert_eq!(url.to_string(), "/articles/go/7");
//! ```
//!
//! ## Configuration Errors
//!
//! Route configuration never panics. The first error on a route is kept and
//! later configuration calls on that route are ignored. Check
//! [`Route::get_error`] or [`Router::first_error`] after setup.
//!
//! ## Concurrency
//!
//! Configure the router on one thread, then share it (`Arc<Router>`) across
//! request threads. Matching, walking and URL building only read the tree;
//! the pattern cache and middleware wrap cache are concurrent maps.

pub mod cli;
pub mod error;
pub mod handler;
pub mod pattern;
pub mod router;
pub mod runtime_config;
pub mod table;

pub use error::{MatchError, RouteError};
pub use handler::{Handler, Middleware, Request, Response};
pub use router::{
    current_route, set_url_vars, var, vars, BuiltUrl, Route, RouteMatch, Router, Vars, Walk,
};
pub use runtime_config::RouterConfig;
pub use table::RouteTable;
