//! Reverse routing: build URLs from a route's templates.
//!
//! ```rust
//! use routemux::Router;
//!
//! let mut router = Router::new();
//! router
//!     .host("{sub}.example.com")
//!     .path("/articles/{id:int}")
//!     .name("article");
//!
//! let url = router
//!     .named_route("article")
//!     .unwrap()
//!     .url([("sub", "news"), ("id", "42")])
//!     .unwrap();
//! assert_eq!(url.to_string(), "http://news.example.com/articles/42");
//! ```

use std::fmt;

use http::Uri;

use super::context::Vars;
use super::route::Route;
use super::view::encode_path;
use crate::error::RouteError;

/// A URL assembled from a route's templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltUrl {
    pub scheme: Option<String>,
    pub host: Option<String>,
    /// Path as it appears on the wire (percent-encoded).
    pub path: String,
    pub query: Option<String>,
}

impl BuiltUrl {
    pub fn to_uri(&self) -> Result<Uri, RouteError> {
        let text = self.to_string();
        text.parse::<Uri>()
            .map_err(|_| RouteError::InvalidUrl { url: text })
    }
}

impl fmt::Display for BuiltUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            let scheme = self.scheme.as_deref().unwrap_or("http");
            write!(f, "{scheme}://{host}")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

impl Route {
    /// Build a URL from host, path and query templates.
    ///
    /// Every variable of every template must be supplied and pass its
    /// constraint. Nothing is built on any failure. The scheme is the first
    /// scheme given to [`Route::schemes`], else `http`, and only appears when
    /// the route has a host.
    pub fn url<I, K, V>(&self, pairs: I) -> Result<BuiltUrl, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = self.prepare(pairs)?;

        let mut url = BuiltUrl {
            scheme: None,
            host: None,
            path: String::new(),
            query: None,
        };
        if let Some(host) = self.host_template() {
            url.host = Some(host.expand(&vars)?);
            url.scheme = Some(self.build_scheme().unwrap_or("http").to_string());
        }
        if self.path_template().is_some() {
            url.path = self.expand_path(&vars)?;
        }
        let queries = self
            .query_templates()
            .iter()
            .map(|q| q.expand(&vars))
            .collect::<Result<Vec<_>, _>>()?;
        if !queries.is_empty() {
            url.query = Some(queries.join("&"));
        }
        Ok(url)
    }

    /// Build only the scheme and host.
    pub fn url_host<I, K, V>(&self, pairs: I) -> Result<BuiltUrl, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = self.prepare(pairs)?;
        let host = self.host_template().ok_or(RouteError::MissingHost)?;
        Ok(BuiltUrl {
            scheme: Some(self.build_scheme().unwrap_or("http").to_string()),
            host: Some(host.expand(&vars)?),
            path: String::new(),
            query: None,
        })
    }

    /// Build only the path.
    pub fn url_path<I, K, V>(&self, pairs: I) -> Result<BuiltUrl, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = self.prepare(pairs)?;
        if self.path_template().is_none() {
            return Err(RouteError::MissingPath);
        }
        Ok(BuiltUrl {
            scheme: None,
            host: None,
            path: self.expand_path(&vars)?,
            query: None,
        })
    }

    fn prepare<I, K, V>(&self, pairs: I) -> Result<Vars, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if let Some(err) = self.get_error() {
            return Err(err.clone());
        }
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Vars>();
        Ok(self.transform_vars(vars))
    }

    fn expand_path(&self, vars: &Vars) -> Result<String, RouteError> {
        let Some(template) = self.path_template() else {
            return Err(RouteError::MissingPath);
        };
        let path = template.expand(vars)?;
        if self.use_encoded_path() {
            Ok(path)
        } else {
            Ok(encode_path(&path))
        }
    }
}
