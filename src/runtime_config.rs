//! # Runtime Configuration Module
//!
//! Environment-driven defaults for a root [`Router`](crate::Router).
//!
//! ## Environment Variables
//!
//! | Variable                     | Field              | Default |
//! |------------------------------|--------------------|---------|
//! | `ROUTEMUX_STRICT_SLASH`      | `strict_slash`     | `off`   |
//! | `ROUTEMUX_SKIP_CLEAN`        | `skip_clean`       | `off`   |
//! | `ROUTEMUX_USE_ENCODED_PATH`  | `use_encoded_path` | `off`   |
//! | `ROUTEMUX_PATTERN_CACHE`     | `pattern_cache`    | `on`    |
//!
//! Accepted values are `on`/`off`, `true`/`false`, `yes`/`no` and `1`/`0`
//! (case-insensitive). Anything else keeps the default.
//!
//! ## Usage
//!
//! ```rust
//! use routemux::runtime_config::RouterConfig;
//! use routemux::Router;
//!
//! let config = RouterConfig::from_env();
//! let router = Router::with_config(&config);
//! assert!(router.routes().is_empty());
//! ```
//!
//! ## Example Configuration
//!
//! ```bash
//! export ROUTEMUX_STRICT_SLASH=on
//! export ROUTEMUX_PATTERN_CACHE=off
//! routemux routes --table routes.yaml
//! ```

use std::env;

use serde::{Deserialize, Serialize};

/// Router flags loaded from the environment or a route table's `config:` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Redirect between `/path` and `/path/` to match the route template.
    pub strict_slash: bool,
    /// Match the path as sent, without `.`/`..` cleaning.
    pub skip_clean: bool,
    /// Match path templates against the percent-encoded path.
    pub use_encoded_path: bool,
    /// Share compiled constraint regexes across routes.
    pub pattern_cache: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strict_slash: false,
            skip_clean: false,
            use_encoded_path: false,
            pattern_cache: true,
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .as_deref()
                .and_then(parse_flag)
                .unwrap_or(default)
        };
        Self {
            strict_slash: flag("ROUTEMUX_STRICT_SLASH", defaults.strict_slash),
            skip_clean: flag("ROUTEMUX_SKIP_CLEAN", defaults.skip_clean),
            use_encoded_path: flag("ROUTEMUX_USE_ENCODED_PATH", defaults.use_encoded_path),
            pattern_cache: flag("ROUTEMUX_PATTERN_CACHE", defaults.pattern_cache),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Some(true),
        "0" | "off" | "false" | "no" => Some(false),
        _ => None,
    }
}
