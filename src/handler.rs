//! Handler and middleware capabilities.
//!
//! The router never looks inside a handler. A handler is anything that can be
//! invoked with a request and a mutable response; a middleware takes a handler
//! and returns a wrapping one. Plain closures implement both traits.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE, LOCATION};
use http::StatusCode;

use crate::router::AllowedMethods;

/// Request type routed by [`Router`](crate::Router).
pub type Request = http::Request<Bytes>;
/// Response sink handed to handlers.
pub type Response = http::Response<Bytes>;

/// Something that serves a request by writing into a response.
pub trait Handler: Send + Sync {
    fn serve(&self, req: &mut Request, res: &mut Response);
}

impl<F> Handler for F
where
    F: Fn(&mut Request, &mut Response) + Send + Sync,
{
    fn serve(&self, req: &mut Request, res: &mut Response) {
        self(req, res)
    }
}

/// Wraps a handler with another handler.
///
/// Middlewares registered on a router run outermost-first in registration
/// order, and only for requests that matched a route.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

impl<F> Middleware for F
where
    F: Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync,
{
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        self(next)
    }
}

/// Default not-found handler: `404 page not found`.
pub fn not_found(_req: &mut Request, res: &mut Response) {
    write_text(res, StatusCode::NOT_FOUND, "404 page not found\n");
}

/// Default method-not-allowed handler.
///
/// Writes `405` and an `Allow` header listing the methods attached to the
/// request as [`AllowedMethods`] by the dispatcher.
pub fn method_not_allowed(req: &mut Request, res: &mut Response) {
    if let Some(AllowedMethods(methods)) = req.extensions().get::<AllowedMethods>() {
        let allow = methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&allow) {
            res.headers_mut().insert(ALLOW, value);
        }
    }
    write_text(res, StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed\n");
}

/// Turn `res` into a redirect to `location`.
pub fn redirect(res: &mut Response, location: &str, status: StatusCode) {
    *res.status_mut() = status;
    match HeaderValue::from_str(location) {
        Ok(value) => {
            res.headers_mut().insert(LOCATION, value);
        }
        Err(_) => {
            tracing::warn!(location = %location, "Redirect target is not a valid header value");
        }
    }
    *res.body_mut() = Bytes::new();
}

fn write_text(res: &mut Response, status: StatusCode, body: &'static str) {
    *res.status_mut() = status;
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    *res.body_mut() = Bytes::from_static(body.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn request() -> Request {
        http::Request::builder()
            .uri("/x")
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_closure_is_a_handler() {
        let handler = |_req: &mut Request, res: &mut Response| {
            *res.body_mut() = Bytes::from_static(b"ok");
        };
        let mut req = request();
        let mut res = Response::new(Bytes::new());
        handler.serve(&mut req, &mut res);
        assert_eq!(res.body().as_ref(), b"ok");
    }

    #[test]
    fn test_method_not_allowed_writes_allow_header() {
        let mut req = request();
        req.extensions_mut()
            .insert(AllowedMethods(vec![Method::GET, Method::PUT]));
        let mut res = Response::new(Bytes::new());
        method_not_allowed(&mut req, &mut res);
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "GET, PUT");
    }

    #[test]
    fn test_redirect_sets_location() {
        let mut res = Response::new(Bytes::from_static(b"stale"));
        redirect(&mut res, "/users/", StatusCode::PERMANENT_REDIRECT);
        assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(res.headers()[LOCATION], "/users/");
        assert!(res.body().is_empty());
    }
}
