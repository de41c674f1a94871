//! # tsu-wrap
//!
//! Write handlers that *return* things. tsu-wrap turns the return value into
//! the response, routes failures to one error channel, and injects services
//! resolved once at startup.
//!
//! ## The contract
//!
//! A handler receives `(Request, Response, Next)` and returns a future. What
//! the future yields decides what happens next:
//!
//! - [`HttpResult`]: `res.status(code).json(body)`
//! - [`Json`], `String`, `&str`, [`Payload`]: `res.send(value)`
//! - `()`, `None`, or the [`Response`] itself: nothing; the handler wrote the
//!   response or called `next`
//! - `Err(e)` or a panic: `next.fail(e)`, exactly once
//!
//! Services are ordinary Rust types. A handler names them in its first
//! parameter and [`Adapter::wrap_with`] resolves them from a
//! [`ServiceLocator`] when the route is built, not per request.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use http::{Method, StatusCode};
//! use tsu_wrap::{
//!     Adapter, Chain, Container, HandlerError, HttpResult, Json, Next, Request, Response,
//!     Router, Server, guard,
//! };
//!
//! struct Orders;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = Adapter::new(Container::new().provide(Orders));
//!
//!     let app = Router::new()
//!         .on(Method::POST, "/orders", adapter.wrap_with(create_order)?)
//!         .on_chain(
//!             Method::GET,
//!             "/orders/{id}",
//!             Chain::new().then(guard::admin_or_seller()).then(adapter.wrap(get_order)),
//!         );
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await?;
//!     Ok(())
//! }
//!
//! async fn create_order(
//!     _orders: Arc<Orders>,
//!     _req: Request,
//!     _res: Response,
//!     _next: Next,
//! ) -> HttpResult<serde_json::Value> {
//!     HttpResult::new(StatusCode::CREATED, serde_json::json!({ "id": 1 }))
//! }
//!
//! async fn get_order(req: Request, _res: Response, _next: Next) -> Result<Json<String>, HandlerError> {
//!     let id = req.param("id").ok_or_else(|| HandlerError::BadRequest("missing id".into()))?;
//!     Ok(Json(id.to_owned()))
//! }
//! ```

mod adapter;
mod auth;
mod config;
mod error;
mod handler;
mod next;
mod reply;
mod request;
mod response;
mod router;
mod server;
mod service;

pub mod guard;

pub use adapter::{Adapter, adapt};
pub use auth::{Principal, Role, UnknownRole};
pub use config::ServerConfig;
pub use error::{BoxError, ConfigError, Error, HandlerError};
pub use handler::{Adapted, Handler};
pub use next::{Flow, Next, Settlement};
pub use reply::{HttpResult, Json, Outcome, Reply};
pub use request::Request;
pub use response::{Payload, Response};
pub use router::{Chain, Router, default_error_handler};
pub use server::Server;
pub use service::{Container, Inject, ServiceLocator};
