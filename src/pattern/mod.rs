//! # Pattern Module
//!
//! Compiles host, path, prefix and query templates into regular expressions
//! plus the metadata needed to run them backwards for URL building.
//!
//! ## Template grammar
//!
//! Literal text interspersed with `{name}` or `{name:constraint}` spans. A
//! constraint is either a built-in macro name (see [`macros`]) or a raw regular
//! expression:
//!
//! ```text
//! /articles/{category}/{id:[0-9]+}
//! /users/{id:uuid}
//! {subdomain}.example.com
//! page={page:int}
//! ```
//!
//! When no constraint is given the variable matches "anything but `/`" in
//! paths, "anything but `.`" in hosts and anything at all in query values.
//!
//! ## Caching
//!
//! Compiled regexes are shared through a [`PatternCache`] owned by the router
//! tree, so routes that repeat a constraint compile it once.

mod cache;
pub mod macros;
mod template;

pub use cache::PatternCache;
pub use macros::Macro;
pub use template::{CompiledTemplate, TemplateKind, TemplateOptions, Validator};
