//! Incoming HTTP request type.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use crate::auth::Principal;
use crate::error::HandlerError;

/// An incoming HTTP request.
///
/// Cloning is cheap: every handler in a route's chain sees the same request,
/// including extensions inserted by earlier middleware.
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    extensions: RwLock<Extensions>,
}

impl Request {
    pub(crate) fn new(req: http::Request<Bytes>, params: HashMap<String, String>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            inner: Arc::new(Inner {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
                params,
                extensions: RwLock::new(parts.extensions),
            }),
        }
    }

    pub fn method(&self) -> &Method { &self.inner.method }
    pub fn uri(&self) -> &Uri { &self.inner.uri }
    pub fn path(&self) -> &str { self.inner.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.inner.headers }
    pub fn body(&self) -> &[u8] { &self.inner.body }

    /// Path plus query string, as the client requested it.
    pub fn original_url(&self) -> &str {
        self.inner
            .uri
            .path_and_query()
            .map_or_else(|| self.path(), |pq| pq.as_str())
    }

    /// Case-insensitive header lookup. Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.inner.params.get(key).map(String::as_str)
    }

    /// Deserializes the body as JSON. Malformed input is a `400`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_slice(&self.inner.body)
            .map_err(|e| HandlerError::BadRequest(format!("invalid JSON body: {e}")))
    }

    /// Stores a value visible to every later handler in the chain.
    pub fn insert_extension<T: Clone + Send + Sync + 'static>(&self, value: T) {
        self.inner.extensions.write().insert(value);
    }

    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.inner.extensions.read().get::<T>().cloned()
    }

    /// The authenticated principal, if an upstream middleware attached one.
    pub fn principal(&self) -> Option<Principal> {
        self.extension::<Principal>()
    }

    pub fn set_principal(&self, principal: Principal) {
        self.insert_extension(principal);
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        Self::new(req, HashMap::new())
    }
}
