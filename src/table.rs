//! # Route Table Module
//!
//! A declarative description of a route tree, loaded from YAML or JSON and
//! installed into a [`Router`].
//!
//! ```yaml
//! config:
//!   strict_slash: true
//! routes:
//!   - name: health
//!     path: /health
//!     methods: [GET]
//!     handler: health
//!   - prefix: /api/v1
//!     routes:
//!       - name: user
//!         path: /users/{id:int}
//!         methods: [GET, DELETE]
//!         handler: user
//!       - name: search
//!         path: /search
//!         queries:
//!           q: "{term}"
//!         handler: search
//! ```
//!
//! Handler keys are resolved through a caller-supplied lookup. A key the
//! lookup does not know, or any route configuration error, fails the install.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::handler::Handler;
use crate::router::Router;
use crate::runtime_config::RouterConfig;

/// A full route table document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteTable {
    /// Router flags. When absent, [`RouterConfig::from_env`] is used.
    pub config: Option<RouterConfig>,
    pub routes: Vec<RouteSpec>,
}

/// One route. Nested `routes` turn it into a subrouter mount point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteSpec {
    pub name: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub prefix: Option<String>,
    pub methods: Vec<String>,
    pub schemes: Vec<String>,
    pub headers: BTreeMap<String, String>,
    pub queries: BTreeMap<String, String>,
    pub build_only: bool,
    pub handler: Option<String>,
    pub routes: Vec<RouteSpec>,
}

impl RouteSpec {
    /// Human-readable identification for error messages.
    fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.path.clone())
            .or_else(|| self.prefix.as_ref().map(|p| format!("{p}*")))
            .or_else(|| self.host.clone())
            .unwrap_or_else(|| "<unnamed>".to_string())
    }
}

impl RouteTable {
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse route table YAML")
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("Failed to parse route table JSON")
    }

    /// Load a table file. `.yaml` and `.yml` files are read as YAML,
    /// everything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route table {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        let table = if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        };
        table.with_context(|| format!("Invalid route table {}", path.display()))
    }

    /// Number of routes in the table, nested routes included.
    #[must_use]
    pub fn len(&self) -> usize {
        fn count(routes: &[RouteSpec]) -> usize {
            routes.iter().map(|r| 1 + count(&r.routes)).sum()
        }
        count(&self.routes)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Create a root router from the table's config and install every route.
    pub fn router<F>(&self, resolve: F) -> anyhow::Result<Router>
    where
        F: Fn(&str) -> Option<Arc<dyn Handler>>,
    {
        let config = self.config.unwrap_or_else(RouterConfig::from_env);
        let mut router = Router::with_config(&config);
        self.install(&mut router, resolve)?;
        Ok(router)
    }

    /// Register the table's routes on `router`, returning how many were added.
    pub fn install<F>(&self, router: &mut Router, resolve: F) -> anyhow::Result<usize>
    where
        F: Fn(&str) -> Option<Arc<dyn Handler>>,
    {
        let mut installed = 0;
        install_routes(router, &self.routes, &resolve, &mut installed)?;

        let mut names = Vec::new();
        collect_names(&self.routes, &mut names);
        info!(
            routes_count = installed,
            named_routes = ?names,
            "Route table installed"
        );
        Ok(installed)
    }
}

fn install_routes<F>(
    router: &mut Router,
    specs: &[RouteSpec],
    resolve: &F,
    installed: &mut usize,
) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<Arc<dyn Handler>>,
{
    for spec in specs {
        if spec.path.is_some() && spec.prefix.is_some() {
            bail!("Route {} sets both path and prefix", spec.label());
        }
        if spec.handler.is_some() && !spec.routes.is_empty() {
            bail!("Route {} sets both a handler and nested routes", spec.label());
        }

        let route = router.new_route();
        if let Some(host) = &spec.host {
            route.host(host);
        }
        if let Some(prefix) = &spec.prefix {
            route.path_prefix(prefix);
        }
        if let Some(path) = &spec.path {
            route.path(path);
        }
        if !spec.methods.is_empty() {
            route.methods(&spec.methods);
        }
        if !spec.schemes.is_empty() {
            route.schemes(&spec.schemes);
        }
        if !spec.headers.is_empty() {
            route.headers(&spec.headers);
        }
        if !spec.queries.is_empty() {
            route.queries(&spec.queries);
        }
        if spec.build_only {
            route.build_only();
        }
        if let Some(name) = &spec.name {
            route.name(name);
        }
        if let Some(key) = &spec.handler {
            let Some(handler) = resolve(key) else {
                bail!("Route {} refers to unknown handler `{key}`", spec.label());
            };
            route.handler_arc(handler);
        }
        if let Some(err) = route.get_error() {
            bail!("Route {}: {err}", spec.label());
        }
        *installed += 1;

        if !spec.routes.is_empty() {
            install_routes(route.subrouter(), &spec.routes, resolve, installed)?;
        }
    }
    Ok(())
}

fn collect_names<'a>(specs: &'a [RouteSpec], out: &mut Vec<&'a str>) {
    for spec in specs {
        if let Some(name) = &spec.name {
            out.push(name);
        }
        collect_names(&spec.routes, out);
    }
}
