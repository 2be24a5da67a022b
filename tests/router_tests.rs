mod common;

use bytes::Bytes;
use common::{body, get, header, reply, request, serve, with_host};
use http::{Method, StatusCode};
use routemux::router::{AllowedMethods, ConnectionInfo};
use routemux::{current_route, var, vars, Request, Response, Router, RouterConfig};

#[test]
fn test_dispatch_sets_context() {
    let mut router = Router::new();
    router
        .handle_fn("/users/{id:int}/posts/{pid}", |req, res| {
            let route = current_route(req).map(|r| r.name.clone().unwrap_or_default());
            let text = format!(
                "{}:{}:{}",
                route.unwrap_or_default(),
                var(req, "id").unwrap_or(""),
                var(req, "pid").unwrap_or("")
            );
            *res.body_mut() = Bytes::from(text);
        })
        .name("post");

    let mut req = get("/users/42/posts/123");
    let res = serve(&router, &mut req);
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res), "post:42:123");

    let all = vars(&req).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(current_route(&req).unwrap().path_template.as_deref(), Some("/users/{id:int}/posts/{pid}"));
}

#[test]
fn test_not_found_default() {
    let mut router = Router::new();
    router.handle_fn("/a", reply("a"));

    let res = serve(&router, &mut get("/b"));
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&res), "404 page not found\n");
}

#[test]
fn test_method_not_allowed_lists_allowed_methods() {
    let mut router = Router::new();
    router.handle_fn("/users", reply("list")).methods(["GET"]);
    router.handle_fn("/users", reply("create")).methods(["POST"]);

    let res = serve(&router, &mut request(Method::DELETE, "/users"));
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header(&res, "allow"), Some("GET, POST"));

    let res = serve(&router, &mut request(Method::POST, "/users"));
    assert_eq!(body(&res), "create");
}

#[test]
fn test_custom_fallback_handlers() {
    let mut router = Router::new();
    router.handle_fn("/only-get", reply("ok")).methods(["GET"]);
    router.not_found_handler(|_req: &mut Request, res: &mut Response| {
        *res.status_mut() = StatusCode::GONE;
    });
    router.method_not_allowed_handler(|req: &mut Request, res: &mut Response| {
        let allowed = req
            .extensions()
            .get::<AllowedMethods>()
            .map(|a| a.0.len())
            .unwrap_or_default();
        *res.status_mut() = StatusCode::IM_A_TEAPOT;
        *res.body_mut() = Bytes::from(allowed.to_string());
    });

    assert_eq!(serve(&router, &mut get("/missing")).status(), StatusCode::GONE);
    let res = serve(&router, &mut request(Method::PUT, "/only-get"));
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body(&res), "1");
}

#[test]
fn test_strict_slash_redirects_preserving_method() {
    let mut router = Router::new();
    router.strict_slash(true);
    router.handle_fn("/users/", reply("users"));
    router.handle_fn("/posts", reply("posts"));

    let res = serve(&router, &mut request(Method::POST, "/users?page=2"));
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(header(&res, "location"), Some("/users/?page=2"));

    let res = serve(&router, &mut get("/users/"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res), "users");

    let res = serve(&router, &mut get("/posts/"));
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(header(&res, "location"), Some("/posts"));
}

#[test]
fn test_without_strict_slash_trailing_slash_is_distinct() {
    let mut router = Router::new();
    router.handle_fn("/users/", reply("users"));

    assert_eq!(serve(&router, &mut get("/users")).status(), StatusCode::NOT_FOUND);
    assert_eq!(serve(&router, &mut get("/users/")).status(), StatusCode::OK);
}

#[test]
fn test_unclean_path_redirects() {
    let mut router = Router::new();
    router.handle_fn("/a/b", reply("ab"));

    let res = serve(&router, &mut get("/a/./x/../b?q=1"));
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(header(&res, "location"), Some("/a/b?q=1"));

    let res = serve(&router, &mut get("//a//b"));
    assert_eq!(header(&res, "location"), Some("/a/b"));
}

#[test]
fn test_targets_without_a_path_are_not_cleaned() {
    let mut router = Router::new();
    router.methods(["CONNECT"]).handler_fn(reply("tunnel"));
    router.methods(["OPTIONS"]).handler_fn(reply("options"));

    let res = serve(&router, &mut request(Method::CONNECT, "example.com:443"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res), "tunnel");

    let res = serve(&router, &mut request(Method::OPTIONS, "*"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res), "options");
}

#[test]
fn test_skip_clean_matches_raw_path() {
    let mut router = Router::new();
    router.skip_clean(true);
    router.handle_fn("/{rest}//x", reply("raw"));

    let res = serve(&router, &mut get("/a//x"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res), "raw");
}

#[test]
fn test_encoded_slash_survives_with_encoded_path() {
    let mut router = Router::new();
    router.use_encoded_path(true);
    router.handle_fn("/files/{name}", |req, res| {
        *res.body_mut() = Bytes::from(var(req, "name").unwrap_or("").to_string());
    });

    let res = serve(&router, &mut get("/files/a%2Fb"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res), "a%2Fb");
}

#[test]
fn test_host_routing() {
    let mut router = Router::new();
    router
        .host("{tenant}.example.com")
        .handler_fn(|req, res| {
            *res.body_mut() = Bytes::from(var(req, "tenant").unwrap_or("").to_string());
        });

    let res = serve(&router, &mut with_host(get("/"), "acme.example.com:8080"));
    assert_eq!(body(&res), "acme");
    let res = serve(&router, &mut with_host(get("/"), "example.org"));
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_scheme_from_connection_info() {
    let mut router = Router::new();
    router.schemes(["https"]).handler_fn(reply("secure"));

    let mut plain = get("/");
    assert_eq!(serve(&router, &mut plain).status(), StatusCode::NOT_FOUND);

    let mut tls = get("/");
    tls.extensions_mut().insert(ConnectionInfo { tls: true });
    assert_eq!(body(&serve(&router, &mut tls)), "secure");
}

#[test]
fn test_route_without_handler_is_not_found() {
    let mut router = Router::new();
    router.path("/bare");

    let res = serve(&router, &mut get("/bare"));
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_with_config() {
    let config = RouterConfig {
        strict_slash: true,
        pattern_cache: false,
        ..RouterConfig::default()
    };
    let mut router = Router::with_config(&config);
    router.handle_fn("/x/", reply("x"));

    assert!(!router.pattern_cache().is_enabled());
    let res = serve(&router, &mut get("/x"));
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
}

#[test]
fn test_router_is_shareable_across_threads() {
    let mut router = Router::new();
    router.handle_fn("/n/{n:int}", |req, res| {
        *res.body_mut() = Bytes::from(var(req, "n").unwrap_or("").to_string());
    });
    let router = std::sync::Arc::new(router);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = std::sync::Arc::clone(&router);
            std::thread::spawn(move || {
                let res = serve(&router, &mut get(&format!("/n/{i}")));
                body(&res)
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), i.to_string());
    }
}
