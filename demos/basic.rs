//! tsu-wrap demo: value-returning handlers, injected services, role guards.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/products/1
//!   curl -X POST http://localhost:3000/products \
//!        -H 'x-role: SELLER' -H 'content-type: application/json' \
//!        -d '{"name":"lamp"}'
//!   curl -X DELETE http://localhost:3000/products/1 -H 'x-role: SELLER'   # 403
//!   curl -X DELETE http://localhost:3000/products/1 -H 'x-role: ADMIN'    # 204

use std::collections::BTreeMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tsu_wrap::{
    Adapter, Chain, Container, HandlerError, HttpResult, Json, Next, Principal, Request, Response,
    Role, Router, Server, ServerConfig, guard,
};

#[derive(Clone, Serialize)]
struct Product {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct NewProduct {
    name: String,
}

/// In-memory product store.
#[derive(Default)]
struct Catalog {
    products: Mutex<BTreeMap<u64, Product>>,
}

impl Catalog {
    fn insert(&self, name: String) -> Product {
        let mut products = self.products.lock();
        let id = products.keys().next_back().map_or(1, |last| last + 1);
        let product = Product { id, name };
        products.insert(id, product.clone());
        product
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let adapter = Adapter::new(Container::new().provide(Catalog::default()));

    let app = Router::new()
        .layer(authenticate)
        .on(Method::GET, "/products/{id}", adapter.wrap_with(get_product)?)
        .on_chain(
            Method::POST,
            "/products",
            Chain::new()
                .then(guard::admin_or_seller())
                .then(adapter.wrap_with(create_product)?),
        )
        .on_chain(
            Method::DELETE,
            "/products/{id}",
            Chain::new()
                .then(guard::only_admin())
                .then(adapter.wrap_with(delete_product)?),
        );

    Server::with_config(&config).serve(app).await?;
    Ok(())
}

// Demo-only authentication: trusts the `x-role` header.
async fn authenticate(req: Request, _res: Response, next: Next) {
    if let Some(role) = req.header("x-role").and_then(|r| r.parse::<Role>().ok()) {
        req.set_principal(Principal::new("demo-user", role));
    }
    next.run();
}

fn product_id(req: &Request) -> Result<u64, HandlerError> {
    req.param("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| HandlerError::BadRequest("product id must be a number".into()))
}

// GET /products/{id}
async fn get_product(
    catalog: Arc<Catalog>,
    req: Request,
    _res: Response,
    _next: Next,
) -> Result<Json<Product>, HandlerError> {
    let id = product_id(&req)?;
    let product = catalog.products.lock().get(&id).cloned();
    product
        .map(Json)
        .ok_or_else(|| HandlerError::NotFound(format!("product {id}")))
}

// POST /products → 201
async fn create_product(
    catalog: Arc<Catalog>,
    req: Request,
    _res: Response,
    _next: Next,
) -> Result<HttpResult<Product>, HandlerError> {
    let input: NewProduct = req.json()?;
    Ok(HttpResult::created(catalog.insert(input.name)))
}

// DELETE /products/{id} → 204, written by hand
async fn delete_product(
    catalog: Arc<Catalog>,
    req: Request,
    res: Response,
    _next: Next,
) -> Result<Response, HandlerError> {
    let id = product_id(&req)?;
    if catalog.products.lock().remove(&id).is_none() {
        return Err(HandlerError::NotFound(format!("product {id}")));
    }
    res.status(StatusCode::NO_CONTENT).end();
    Ok(res)
}
