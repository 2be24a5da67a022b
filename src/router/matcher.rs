//! Request predicates attached to a route.
//!
//! # Design Decisions
//! - Closed family of predicates (method, header, header regex, scheme) plus a
//!   custom escape hatch
//! - Header names are case-insensitive (`HeaderName` is normalized)
//! - A failed method check is reported as [`Verdict::MethodMismatch`], not as
//!   a plain miss, so dispatch can tell 405 from 404
//! - A custom predicate may return `MethodMismatch` itself and takes part in
//!   the same classification

use std::fmt;
use std::sync::Arc;

use http::header::HeaderName;
use http::Method;
use regex::Regex;

use super::context::ConnectionInfo;
use crate::handler::Request;

/// Outcome of evaluating one matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    NoMatch,
    MethodMismatch,
}

impl From<bool> for Verdict {
    fn from(matched: bool) -> Self {
        if matched {
            Verdict::Match
        } else {
            Verdict::NoMatch
        }
    }
}

/// A user supplied predicate.
pub type MatchFn = Arc<dyn Fn(&Request) -> Verdict + Send + Sync>;

/// One predicate over a request.
#[derive(Clone)]
pub enum Matcher {
    /// Request method is one of the listed methods.
    Methods(Vec<Method>),
    /// Every listed header is present; a non-empty expected value must equal
    /// one of the header's values.
    Headers(Vec<(HeaderName, String)>),
    /// Every listed header is present; with a regex, one of its values must match.
    HeadersRegex(Vec<(HeaderName, Option<Arc<Regex>>)>),
    /// Request scheme is one of the listed (lower-case) schemes.
    Schemes(Vec<String>),
    Custom(MatchFn),
}

impl Matcher {
    pub fn evaluate(&self, req: &Request) -> Verdict {
        match self {
            Matcher::Methods(methods) => {
                if methods.contains(req.method()) {
                    Verdict::Match
                } else {
                    Verdict::MethodMismatch
                }
            }
            Matcher::Headers(pairs) => pairs
                .iter()
                .all(|(name, expected)| {
                    let mut values = req.headers().get_all(name).iter().peekable();
                    if values.peek().is_none() {
                        return false;
                    }
                    expected.is_empty()
                        || values.any(|v| v.to_str().map_or(false, |v| v == expected))
                })
                .into(),
            Matcher::HeadersRegex(pairs) => pairs
                .iter()
                .all(|(name, regex)| {
                    let mut values = req.headers().get_all(name).iter().peekable();
                    if values.peek().is_none() {
                        return false;
                    }
                    match regex {
                        None => true,
                        Some(re) => values.any(|v| v.to_str().map_or(false, |v| re.is_match(v))),
                    }
                })
                .into(),
            Matcher::Schemes(schemes) => {
                let scheme = request_scheme(req);
                schemes.iter().any(|s| s == scheme).into()
            }
            Matcher::Custom(f) => f(req),
        }
    }

    /// Methods accepted by this matcher, if it is a method matcher.
    #[must_use]
    pub fn methods(&self) -> Option<&[Method]> {
        match self {
            Matcher::Methods(methods) => Some(methods),
            _ => None,
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Methods(m) => f.debug_tuple("Methods").field(m).finish(),
            Matcher::Headers(h) => f.debug_tuple("Headers").field(h).finish(),
            Matcher::HeadersRegex(h) => {
                let shown: Vec<_> = h
                    .iter()
                    .map(|(name, re)| (name, re.as_ref().map(|r| r.as_str())))
                    .collect();
                f.debug_tuple("HeadersRegex").field(&shown).finish()
            }
            Matcher::Schemes(s) => f.debug_tuple("Schemes").field(s).finish(),
            Matcher::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Scheme of the request URI, or `https`/`http` inferred from the transport.
pub(crate) fn request_scheme(req: &Request) -> &str {
    match req.uri().scheme_str() {
        Some(scheme) => scheme,
        None => {
            let tls = req
                .extensions()
                .get::<ConnectionInfo>()
                .map_or(false, |info| info.tls);
            if tls {
                "https"
            } else {
                "http"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn request(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_method_matcher_reports_mismatch() {
        let m = Matcher::Methods(vec![Method::GET, Method::HEAD]);
        assert_eq!(m.evaluate(&request(Method::GET, "/", &[])), Verdict::Match);
        assert_eq!(
            m.evaluate(&request(Method::DELETE, "/", &[])),
            Verdict::MethodMismatch
        );
    }

    #[test]
    fn test_header_matcher() {
        let m = Matcher::Headers(vec![
            (HeaderName::from_static("content-type"), "application/json".into()),
            (HeaderName::from_static("x-token"), String::new()),
        ]);
        let ok = request(
            Method::GET,
            "/",
            &[("Content-Type", "application/json"), ("X-Token", "abc")],
        );
        assert_eq!(m.evaluate(&ok), Verdict::Match);

        let wrong_value = request(
            Method::GET,
            "/",
            &[("Content-Type", "text/html"), ("X-Token", "abc")],
        );
        assert_eq!(m.evaluate(&wrong_value), Verdict::NoMatch);

        let missing = request(Method::GET, "/", &[("Content-Type", "application/json")]);
        assert_eq!(m.evaluate(&missing), Verdict::NoMatch);
    }

    #[test]
    fn test_header_regex_matcher() {
        let re = Arc::new(Regex::new("^application/(json|xml)$").unwrap());
        let m = Matcher::HeadersRegex(vec![(HeaderName::from_static("accept"), Some(re))]);
        assert_eq!(
            m.evaluate(&request(Method::GET, "/", &[("accept", "application/xml")])),
            Verdict::Match
        );
        assert_eq!(
            m.evaluate(&request(Method::GET, "/", &[("accept", "text/plain")])),
            Verdict::NoMatch
        );
    }

    #[test]
    fn test_scheme_matcher_infers_from_transport() {
        let m = Matcher::Schemes(vec!["https".into()]);
        assert_eq!(
            m.evaluate(&request(Method::GET, "https://example.com/", &[])),
            Verdict::Match
        );
        assert_eq!(
            m.evaluate(&request(Method::GET, "http://example.com/", &[])),
            Verdict::NoMatch
        );

        let mut plain = request(Method::GET, "/", &[]);
        assert_eq!(m.evaluate(&plain), Verdict::NoMatch);
        plain.extensions_mut().insert(ConnectionInfo { tls: true });
        assert_eq!(m.evaluate(&plain), Verdict::Match);
    }

    #[test]
    fn test_custom_matcher() {
        let m = Matcher::Custom(Arc::new(|req: &Request| -> Verdict {
            req.uri().path().ends_with(".json").into()
        }));
        assert_eq!(m.evaluate(&request(Method::GET, "/a.json", &[])), Verdict::Match);
        assert_eq!(m.evaluate(&request(Method::GET, "/a.xml", &[])), Verdict::NoMatch);
    }
}
