use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use http::header::{HeaderName, ALLOW, LOCATION};
use serde::Serialize;

use crate::handler::{Handler, Request, Response};
use crate::router::{current_route, vars, ConnectionInfo, Router, Walk};
use crate::table::RouteTable;

/// Command-line interface for routemux
///
/// Loads a declarative route table and inspects it without running a server.
#[derive(Parser)]
#[command(name = "routemux")]
#[command(about = "Inspect and exercise routemux route tables", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Load a route table and report the first configuration error
    Check {
        /// Path to the route table (YAML or JSON)
        #[arg(short, long, env = "ROUTEMUX_TABLE")]
        table: PathBuf,
    },
    /// List every route in walk order
    Routes {
        /// Path to the route table (YAML or JSON)
        #[arg(short, long, env = "ROUTEMUX_TABLE")]
        table: PathBuf,
    },
    /// Dispatch a synthetic request and print the outcome as JSON
    Match {
        /// Path to the route table (YAML or JSON)
        #[arg(short, long, env = "ROUTEMUX_TABLE")]
        table: PathBuf,

        /// Request method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request header as `name:value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Treat the request as received over TLS
        #[arg(long, default_value_t = false)]
        tls: bool,

        /// Request target: a path (`/users/1?x=y`) or an absolute URL
        url: String,
    },
    /// Build a URL for a named route
    Url {
        /// Path to the route table (YAML or JSON)
        #[arg(short, long, env = "ROUTEMUX_TABLE")]
        table: PathBuf,

        /// Route name
        name: String,

        /// Variable as `key=value` (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

/// Outcome of the `match` command.
#[derive(Debug, Serialize)]
pub struct MatchReport {
    pub status: u16,
    pub handler: Option<String>,
    pub route: Option<String>,
    pub vars: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<String>,
}

/// Stand-in for application handlers: answers with its own key.
struct KeyHandler(String);

impl Handler for KeyHandler {
    fn serve(&self, _req: &mut Request, res: &mut Response) {
        *res.body_mut() = Bytes::from(self.0.clone());
    }
}

/// Parse the command line and run the selected command against stdout.
///
/// # Errors
///
/// Returns an error if the route table cannot be loaded or installed, or if
/// the command itself fails (unknown route name, invalid request).
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(&cli, &mut stdout.lock())
}

/// Run `cli`, writing command output to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Check { table } => {
            let table = RouteTable::load(table)?;
            let router = load_router(&table)?;
            if let Some(err) = router.first_error() {
                bail!("configuration error: {err}");
            }
            writeln!(out, "ok: {} routes", table.len())?;
            Ok(())
        }
        Commands::Routes { table } => {
            let router = load_router(&RouteTable::load(table)?)?;
            write_routes(&router, out)
        }
        Commands::Match {
            table,
            method,
            headers,
            tls,
            url,
        } => {
            let router = load_router(&RouteTable::load(table)?)?;
            let report = dispatch(&router, method, headers, *tls, url)?;
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
            Ok(())
        }
        Commands::Url { table, name, vars } => {
            let router = load_router(&RouteTable::load(table)?)?;
            let route = router
                .named_route(name)
                .ok_or_else(|| anyhow!("no route named `{name}`"))?;
            let url = route
                .url(vars.iter().map(|(k, v)| (k.clone(), v.clone())))
                .with_context(|| format!("cannot build URL for `{name}`"))?;
            writeln!(out, "{url}")?;
            Ok(())
        }
    }
}

/// Install a table with every handler key answered by [`KeyHandler`].
pub fn load_router(table: &RouteTable) -> anyhow::Result<Router> {
    table.router(|key| Some(Arc::new(KeyHandler(key.to_string())) as Arc<dyn Handler>))
}

fn write_routes(router: &Router, out: &mut dyn Write) -> anyhow::Result<()> {
    router.walk(|route, _, ancestors| {
        let indent = "  ".repeat(ancestors.len());
        let methods = route
            .get_methods()
            .map(|m| m.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(","))
            .unwrap_or_else(|| "*".to_string());
        let target = format!(
            "{}{}",
            route.get_host_template().unwrap_or(""),
            route.get_path_template().unwrap_or("")
        );
        let mut line = format!("{indent}{methods} {target}");
        for query in route.get_queries_templates() {
            line.push_str(&format!(" ?{query}"));
        }
        if let Some(name) = route.get_name() {
            line.push_str(&format!(" [{name}]"));
        }
        if route.is_build_only() {
            line.push_str(" (build-only)");
        }
        writeln!(out, "{line}")?;
        Ok::<_, anyhow::Error>(Walk::Continue)
    })
}

/// Serve one synthetic request and summarise the response.
pub fn dispatch(
    router: &Router,
    method: &str,
    headers: &[String],
    tls: bool,
    url: &str,
) -> anyhow::Result<MatchReport> {
    let mut builder = http::Request::builder()
        .method(method.to_ascii_uppercase().as_str())
        .uri(url);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("header `{header}` is not `name:value`"))?;
        builder = builder.header(name.trim(), value.trim());
    }
    let mut req: Request = builder
        .body(Bytes::new())
        .with_context(|| format!("invalid request {method} {url}"))?;
    req.extensions_mut().insert(ConnectionInfo { tls });

    let mut res = Response::new(Bytes::new());
    router.serve(&mut req, &mut res);

    let header = |name: HeaderName| {
        res.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let matched = res.status().is_success() && current_route(&req).is_some();
    Ok(MatchReport {
        status: res.status().as_u16(),
        handler: matched.then(|| String::from_utf8_lossy(res.body()).into_owned()),
        route: current_route(&req).and_then(|r| r.name.clone()),
        vars: vars(&req)
            .map(|v| v.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
        location: header(LOCATION),
        allow: header(ALLOW),
    })
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("`{s}` is not `key=value`"))
}
