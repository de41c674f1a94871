//! Radix-tree request router and chain dispatch.
//!
//! One tree per HTTP method, O(path-length) lookup. Each route maps to a
//! [`Chain`] of handlers run in order; a handler moves the request along with
//! `next.run()` or hands it to the error channel with `next.fail(err)`.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use matchit::Router as MatchitRouter;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::error::HandlerError;
use crate::handler::{BoxedHandler, Handler};
use crate::next::{Flow, Next};
use crate::request::Request;
use crate::response::Response;

type ErrorHandler = Arc<dyn Fn(HandlerError, &Request, &Response) + Send + Sync>;

/// An ordered list of handlers registered for one route.
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<BoxedHandler>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler. Returns `self` for chaining.
    pub fn then(mut self, handler: impl Handler) -> Self {
        self.handlers.push(handler.into_boxed_handler());
        self
    }
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<Chain>>>,
    layers: Vec<BoxedHandler>,
    on_error: ErrorHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            layers: Vec::new(),
            on_error: Arc::new(default_error_handler),
        }
    }

    /// Register a single handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.on_chain(method, path, Chain::new().then(handler))
    }

    /// Register a chain, e.g. a guard followed by the real handler.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with an existing one.
    pub fn on_chain(mut self, method: Method, path: &str, chain: Chain) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(chain))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Middleware run before every route's chain, in registration order.
    pub fn layer(mut self, handler: impl Handler) -> Self {
        self.layers.push(handler.into_boxed_handler());
        self
    }

    /// Replaces the error channel. Called at most once per request.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(HandlerError, &Request, &Response) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(handler);
        self
    }

    /// Runs one request through the layers and the matched route's chain.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let res = Response::new();

        let Some((chain, params)) = self.lookup(req.method(), req.uri().path()) else {
            let req = Request::from(req);
            let err = HandlerError::NotFound(format!("cannot {} {}", req.method(), req.path()));
            self.fail(err, &req, &res);
            return res;
        };
        let req = Request::new(req, params);

        for handler in self.layers.iter().chain(chain.handlers.iter()) {
            let (next, settlement) = Next::channel();
            handler.call(req.clone(), res.clone(), next).await;

            match settlement.flow().await {
                Flow::Continue => continue,
                Flow::Fail(err) => {
                    self.fail(err, &req, &res);
                    return res;
                }
                Flow::Halt => {
                    if !res.is_sent() {
                        warn!(method = %req.method(), path = req.path(), "chain halted without a response");
                    }
                    return res;
                }
            }
        }

        // Every handler continued: nothing left to answer with.
        let err = HandlerError::NotFound(format!("cannot {} {}", req.method(), req.path()));
        self.fail(err, &req, &res);
        res
    }

    /// Hands `err` to the error channel. A panicking error handler falls
    /// back to [`default_error_handler`].
    fn fail(&self, err: HandlerError, req: &Request, res: &Response) {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| (self.on_error)(err, req, res))) {
            default_error_handler(HandlerError::from_panic(panic), req, res);
        }
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(Arc<Chain>, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((Arc::clone(matched.value), params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Writes `{"error": kind, "message": msg}` with the error's status, unless
/// the response was already sent.
pub fn default_error_handler(err: HandlerError, req: &Request, res: &Response) {
    let status = err.status();
    if status.is_server_error() {
        error!(method = %req.method(), url = req.original_url(), error = %err, "request failed");
    } else {
        debug!(method = %req.method(), url = req.original_url(), error = %err, "request rejected");
    }

    if res.is_sent() {
        return;
    }

    let message = match &err {
        // Internal details stay in the log.
        HandlerError::Panicked(_) | HandlerError::Internal(_) => "internal server error".to_owned(),
        other => other.to_string(),
    };
    let body = json!({ "error": err.kind(), "message": message });
    if let Err(e) = res.status(status).json(&body) {
        error!(error = %e, "failed to write error response");
    }
}
