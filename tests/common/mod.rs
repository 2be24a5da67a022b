#![allow(dead_code)]

use bytes::Bytes;
use http::Method;
use routemux::{Handler, Request, Response, Router};

pub fn request(method: Method, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

pub fn get(uri: &str) -> Request {
    request(Method::GET, uri)
}

pub fn with_host(mut req: Request, host: &str) -> Request {
    req.headers_mut().insert("host", host.parse().unwrap());
    req
}

/// Serve `req` and return the response.
pub fn serve(router: &Router, req: &mut Request) -> Response {
    let mut res = Response::new(Bytes::new());
    router.serve(req, &mut res);
    res
}

pub fn body(res: &Response) -> String {
    String::from_utf8_lossy(res.body()).into_owned()
}

pub fn header<'a>(res: &'a Response, name: &str) -> Option<&'a str> {
    res.headers().get(name).and_then(|v| v.to_str().ok())
}

/// A handler that answers with a fixed body.
pub fn reply(text: &'static str) -> impl Fn(&mut Request, &mut Response) + Send + Sync + 'static {
    move |_req, res| *res.body_mut() = Bytes::from_static(text.as_bytes())
}

pub mod temp_files {
    use std::io::Write;

    /// Write `content` to a fresh temporary file with the given extension.
    pub fn create(content: &str, ext: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("routemux_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}
