//! The parts of a request that templates are matched against, extracted once
//! per dispatch and shared by every route evaluated for it.

use std::borrow::Cow;

use http::header::HOST;

use crate::handler::Request;
use crate::pattern::CompiledTemplate;

pub(crate) struct RequestView<'a> {
    pub(crate) req: &'a Request,
    host: String,
    host_without_port: String,
    raw_path: &'a str,
    decoded_path: Cow<'a, str>,
    query: Vec<(String, String)>,
}

impl<'a> RequestView<'a> {
    pub(crate) fn new(req: &'a Request) -> Self {
        let host = request_host(req);
        let host_without_port = strip_port(&host).to_string();
        let raw_path = req.uri().path();
        let query = req
            .uri()
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self {
            req,
            host,
            host_without_port,
            raw_path,
            decoded_path: decode_path(raw_path),
            query,
        }
    }

    /// Host to match `template` against: port removed unless the template names one.
    pub(crate) fn host_for(&self, template: &CompiledTemplate) -> &str {
        if template.ignores_port() {
            &self.host_without_port
        } else {
            &self.host
        }
    }

    pub(crate) fn path(&self, encoded: bool) -> &str {
        if encoded {
            self.raw_path
        } else {
            &self.decoded_path
        }
    }

    /// First value of a query parameter.
    pub(crate) fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Lower-cased request host: the URI authority for absolute-form requests,
/// otherwise the `Host` header. User info is dropped.
fn request_host(req: &Request) -> String {
    let raw = match req.uri().authority() {
        Some(authority) => authority.as_str(),
        None => req
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or(""),
    };
    let without_userinfo = raw.rsplit_once('@').map_or(raw, |(_, host)| host);
    without_userinfo.to_ascii_lowercase()
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep everything up to the closing bracket.
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Percent-decoded path; paths that do not decode to UTF-8 are used as-is.
pub(crate) fn decode_path(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Percent-encode each segment of a decoded path.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
    }

    #[test]
    fn test_view_reads_host_path_and_query() {
        let req = http::Request::builder()
            .uri("/files/a%20b?page=2&page=3&q=x+y")
            .header("Host", "API.Example.com:8443")
            .body(Bytes::new())
            .unwrap();
        let view = RequestView::new(&req);
        assert_eq!(view.host, "api.example.com:8443");
        assert_eq!(view.host_without_port, "api.example.com");
        assert_eq!(view.path(false), "/files/a b");
        assert_eq!(view.path(true), "/files/a%20b");
        assert_eq!(view.query_value("page"), Some("2"));
        assert_eq!(view.query_value("q"), Some("x y"));
        assert_eq!(view.query_value("missing"), None);
    }

    #[test]
    fn test_absolute_uri_host_wins() {
        let req = http::Request::builder()
            .uri("http://Sub.Example.com/x")
            .header("Host", "ignored.example.com")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(RequestView::new(&req).host, "sub.example.com");
    }

    #[test]
    fn test_encode_path_round_trip() {
        assert_eq!(encode_path("/a b/c"), "/a%20b/c");
        assert_eq!(decode_path(&encode_path("/a b/c")), "/a b/c");
    }
}
