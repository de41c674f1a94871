//! End-to-end tests for adapted handlers running inside a router.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tsu_wrap::{
    Adapter, ConfigError, Container, HandlerError, HttpResult, Json, Next, Request, Response,
    Router, adapt,
};

fn get(uri: &str) -> http::Request<Bytes> {
    http::Request::builder().method(Method::GET).uri(uri).body(Bytes::new()).unwrap()
}

fn post(uri: &str, body: Value) -> http::Request<Bytes> {
    http::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

fn body_json(res: &Response) -> Value {
    serde_json::from_slice(&res.body()).unwrap()
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Order {
    id: u64,
    item: String,
}

#[derive(Deserialize)]
struct NewOrder {
    item: String,
}

/// Hands out ids; counts how often the container built it.
struct OrderIds(AtomicUsize);

async fn create_order(
    ids: Arc<OrderIds>,
    req: Request,
    _res: Response,
    _next: Next,
) -> Result<HttpResult<Order>, HandlerError> {
    let input: NewOrder = req.json()?;
    let id = ids.0.fetch_add(1, Ordering::SeqCst) as u64 + 1;
    Ok(HttpResult::created(Order { id, item: input.item }))
}

async fn show_order(req: Request, _res: Response, _next: Next) -> Result<Json<Order>, HandlerError> {
    match req.param("id") {
        Some("1") => Ok(Json(Order { id: 1, item: "tea".into() })),
        Some(other) => Err(HandlerError::NotFound(format!("order {other}"))),
        None => Err(HandlerError::BadRequest("missing id".into())),
    }
}

#[tokio::test]
async fn structured_result_reaches_the_client() {
    let adapter = Adapter::new(Container::new().provide(OrderIds(AtomicUsize::new(0))));
    let app = Router::new().on(Method::POST, "/orders", adapter.wrap_with(create_order).unwrap());

    let res = app.handle(post("/orders", json!({ "item": "tea" }))).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert_eq!(body_json(&res), json!({ "id": 1, "item": "tea" }));

    let res = app.handle(post("/orders", json!({ "item": "cake" }))).await;
    assert_eq!(body_json(&res), json!({ "id": 2, "item": "cake" }));
}

#[tokio::test]
async fn errors_go_through_the_error_channel() {
    let app = Router::new().on(Method::GET, "/orders/{id}", adapt(show_order));

    let res = app.handle(get("/orders/1")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body_json(&res), json!({ "id": 1, "item": "tea" }));

    let res = app.handle(get("/orders/7")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(&res), json!({ "error": "not_found", "message": "not found: order 7" }));
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let adapter = Adapter::new(Container::new().provide(OrderIds(AtomicUsize::new(0))));
    let app = Router::new().on(Method::POST, "/orders", adapter.wrap_with(create_order).unwrap());

    let res = app.handle(post("/orders", json!({ "sku": 3 }))).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&res)["error"], "bad_request");
}

#[tokio::test]
async fn panics_become_internal_errors_without_details() {
    let app = Router::new().on(
        Method::GET,
        "/boom",
        adapt(|_req: Request, _res: Response, _next: Next| async {
            if true {
                panic!("secret detail");
            }
            "unreachable"
        }),
    );

    let res = app.handle(get("/boom")).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&res), json!({ "error": "panicked", "message": "internal server error" }));
}

#[tokio::test]
async fn error_channel_runs_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let app = Router::new()
        .on(
            Method::GET,
            "/twice",
            adapt(|_req: Request, _res: Response, next: Next| async move {
                next.fail(HandlerError::Forbidden("first".into()));
                Err::<(), _>(HandlerError::internal("second"))
            }),
        )
        .on_error(move |err, _req, res| {
            counter.fetch_add(1, Ordering::SeqCst);
            res.status(err.status()).send(err.to_string());
        });

    let res = app.handle(get("/twice")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(&res.body()[..], b"forbidden: first");
}

#[tokio::test]
async fn manual_writes_are_left_alone() {
    let app = Router::new().on(
        Method::GET,
        "/manual",
        adapt(|_req: Request, res: Response, _next: Next| async move {
            res.status(StatusCode::ACCEPTED).send("queued");
            res
        }),
    );

    let res = app.handle(get("/manual")).await;
    assert_eq!(res.status_code(), StatusCode::ACCEPTED);
    assert_eq!(&res.body()[..], b"queued");
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = Router::new();
    let res = app.handle(get("/nowhere")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(&res)["message"], "not found: cannot GET /nowhere");
}

#[test]
fn wrap_time_failures_are_configuration_errors() {
    let err = Adapter::detached().wrap_with(create_order).err().unwrap();
    assert!(matches!(err, ConfigError::ProviderUnavailable));

    let err = Adapter::new(Container::new()).wrap_with(create_order).err().unwrap();
    assert!(err.to_string().contains("OrderIds"));
}

async fn exploding_layer(_req: Request, _res: Response, _next: Next) {
    panic!("layer boom");
}

async fn late_exploding_layer(_req: Request, _res: Response, _next: Next) {
    tokio::task::yield_now().await;
    panic!("late boom");
}

#[tokio::test]
async fn panicking_layer_reaches_the_error_channel() {
    let app = Arc::new(Router::new().layer(exploding_layer).on(
        Method::GET,
        "/x",
        adapt(|_req: Request, _res: Response, _next: Next| async { "unreachable" }),
    ));

    let res = tokio::spawn(async move { app.handle(get("/x")).await })
        .await
        .expect("request task must not panic");
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&res), json!({ "error": "panicked", "message": "internal server error" }));
}

#[tokio::test]
async fn layer_panicking_while_polled_is_forwarded() {
    let app = Router::new()
        .layer(late_exploding_layer)
        .on(Method::GET, "/x", adapt(|_req: Request, _res: Response, _next: Next| async { "unreachable" }));

    let res = app.handle(get("/x")).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&res)["error"], "panicked");
}

#[tokio::test]
async fn panicking_error_handler_falls_back_to_default() {
    let app = Router::new().on_error(|_err, _req, _res| panic!("handler boom"));

    let res = app.handle(get("/nowhere")).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&res), json!({ "error": "panicked", "message": "internal server error" }));
}
