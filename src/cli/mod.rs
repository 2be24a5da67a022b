//! # CLI Module
//!
//! Command-line inspection of declarative route tables (see
//! [`table`](crate::table)).
//!
//! ## Commands
//!
//! ### `check`
//!
//! Load and install a table, failing on the first configuration error:
//!
//! ```bash
//! routemux check --table routes.yaml
//! ```
//!
//! ### `routes`
//!
//! List routes in match order, nested routes indented under their mount point:
//!
//! ```bash
//! routemux routes --table routes.yaml
//! ```
//!
//! ### `match`
//!
//! Dispatch a synthetic request and print status, handler key, route name and
//! variables as JSON:
//!
//! ```bash
//! routemux match --table routes.yaml -X DELETE /api/v1/users/42
//! ```
//!
//! ### `url`
//!
//! Build a URL for a named route:
//!
//! ```bash
//! routemux url --table routes.yaml user --var id=42
//! ```
//!
//! The table path may also come from `ROUTEMUX_TABLE`.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{dispatch, load_router, run, run_cli, Cli, Commands, MatchReport};
