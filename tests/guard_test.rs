//! Role guards in front of real handlers, with principals attached by a layer.

use bytes::Bytes;
use http::{Method, StatusCode};
use serde_json::Value;
use tsu_wrap::{Chain, Next, Principal, Request, Response, Role, Router, adapt, guard};

/// Test stand-in for an authentication layer: trusts `x-role`.
async fn authenticate(req: Request, _res: Response, next: Next) {
    if let Some(role) = req.header("x-role").and_then(|r| r.parse::<Role>().ok()) {
        req.set_principal(Principal::new("u-42", role));
    }
    next.run();
}

fn app() -> Router {
    let dashboard = adapt(|req: Request, _res: Response, _next: Next| async move {
        let principal = req.principal().map(|p| p.role.to_string());
        principal.unwrap_or_else(|| "anonymous".to_owned())
    });

    Router::new()
        .layer(authenticate)
        .on_chain(
            Method::GET,
            "/admin/users",
            Chain::new().then(guard::only_admin()).then(dashboard.clone()),
        )
        .on_chain(
            Method::GET,
            "/catalog",
            Chain::new().then(guard::admin_or_seller()).then(dashboard.clone()),
        )
        .on_chain(
            Method::GET,
            "/public",
            Chain::new().then(guard::only_roles([])).then(dashboard),
        )
}

fn get(uri: &str, role: Option<&str>) -> http::Request<Bytes> {
    let mut builder = http::Request::builder().method(Method::GET).uri(uri);
    if let Some(role) = role {
        builder = builder.header("x-role", role);
    }
    builder.body(Bytes::new()).unwrap()
}

#[tokio::test]
async fn admin_passes_admin_guard() {
    let res = app().handle(get("/admin/users", Some("ADMIN"))).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(&res.body()[..], b"ADMIN");
}

#[tokio::test]
async fn seller_is_forbidden_with_the_requested_url() {
    let res = app().handle(get("/admin/users?sort=name", Some("SELLER"))).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let body: Value = serde_json::from_slice(&res.body()).unwrap();
    assert_eq!(body["error"], "forbidden");
    assert!(body["message"].as_str().unwrap().contains("/admin/users?sort=name"));
}

#[tokio::test]
async fn seller_passes_admin_or_seller() {
    let res = app().handle(get("/catalog", Some("SELLER"))).await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let res = app().handle(get("/catalog", Some("CUSTOMER"))).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_principal_is_unauthorized() {
    let res = app().handle(get("/catalog", None)).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_role_list_lets_everyone_through() {
    let res = app().handle(get("/public", None)).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(&res.body()[..], b"anonymous");

    let res = app().handle(get("/public", Some("CUSTOMER"))).await;
    assert_eq!(&res.body()[..], b"CUSTOMER");
}
