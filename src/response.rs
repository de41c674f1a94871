//! Outgoing response handle and the [`Payload`] body type.
//!
//! Every handler in a chain receives a clone of the same [`Response`]. Writes
//! go through `&self`, so `res.status(StatusCode::CREATED).json(&body)` reads
//! the same as in any callback-style framework. Once a body has been written
//! the response counts as sent; later writes are logged and ignored.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use crate::error::HandlerError;

// ── Payload ───────────────────────────────────────────────────────────────────

/// A body for [`Response::send`]. The variant decides the content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),            // text/plain; charset=utf-8
    Json(serde_json::Value), // application/json
    Bytes(Bytes),            // application/octet-stream
}

impl Payload {
    fn content_type(&self) -> &'static str {
        match self {
            Self::Text(_)  => "text/plain; charset=utf-8",
            Self::Json(_)  => "application/json",
            Self::Bytes(_) => "application/octet-stream",
        }
    }

    fn into_bytes(self) -> Result<Bytes, serde_json::Error> {
        match self {
            Self::Text(s)  => Ok(Bytes::from(s)),
            Self::Json(v)  => serde_json::to_vec(&v).map(Bytes::from),
            Self::Bytes(b) => Ok(b),
        }
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self { Self::Json(v) }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self { Self::Bytes(b) }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self { Self::Bytes(Bytes::from(b)) }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// A shared, writable HTTP response.
///
/// ```rust
/// use tsu_wrap::Response;
/// use http::StatusCode;
///
/// let res = Response::new();
/// res.status(StatusCode::CREATED).json(&serde_json::json!({ "id": 1 })).unwrap();
/// assert!(res.is_sent());
/// ```
#[derive(Clone, Default)]
pub struct Response {
    inner: Arc<Mutex<Parts>>,
}

#[derive(Default)]
struct Parts {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    sent: bool,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status code. Returns `self` so a body write can follow.
    pub fn status(&self, code: StatusCode) -> &Self {
        let mut parts = self.inner.lock();
        if parts.sent {
            warn!(%code, "status set after response was sent, ignoring");
        } else {
            parts.status = code;
        }
        drop(parts);
        self
    }

    pub fn header(&self, name: HeaderName, value: HeaderValue) -> &Self {
        let mut parts = self.inner.lock();
        if parts.sent {
            warn!(header = %name, "header set after response was sent, ignoring");
        } else {
            parts.headers.insert(name, value);
        }
        drop(parts);
        self
    }

    /// Serializes `body` as JSON and sends it.
    pub fn json<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), HandlerError> {
        let bytes = serde_json::to_vec(body)?;
        self.write("application/json", Bytes::from(bytes));
        Ok(())
    }

    /// Sends a plain value. The content type follows the [`Payload`] variant.
    pub fn send(&self, payload: impl Into<Payload>) {
        let payload = payload.into();
        let content_type = payload.content_type();
        match payload.into_bytes() {
            Ok(bytes) => self.write(content_type, bytes),
            // A `Value` always serializes; keep the failure visible anyway.
            Err(e) => warn!(error = %e, "failed to encode JSON payload"),
        }
    }

    /// Finishes the response with an empty body, e.g. after `204 No Content`.
    pub fn end(&self) {
        let mut parts = self.inner.lock();
        if parts.sent {
            warn!("response already sent, ignoring end");
            return;
        }
        parts.body = Bytes::new();
        parts.sent = true;
    }

    /// `true` once a body has been written.
    pub fn is_sent(&self) -> bool {
        self.inner.lock().sent
    }

    pub fn status_code(&self) -> StatusCode {
        self.inner.lock().status
    }

    pub fn body(&self) -> Bytes {
        self.inner.lock().body.clone()
    }

    pub fn header_value(&self, name: &str) -> Option<HeaderValue> {
        self.inner.lock().headers.get(name).cloned()
    }

    /// `true` if both handles point at the same response.
    pub fn same_as(&self, other: &Response) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn write(&self, content_type: &'static str, body: Bytes) {
        let mut parts = self.inner.lock();
        if parts.sent {
            warn!("response already sent, dropping second body");
            return;
        }
        parts.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        parts.body = body;
        parts.sent = true;
    }

    /// Snapshot for hyper. Called once the chain has finished.
    pub(crate) fn to_http(&self) -> http::Response<Full<Bytes>> {
        let parts = self.inner.lock();
        let mut res = http::Response::new(Full::new(parts.body.clone()));
        *res.status_mut() = parts.status;
        *res.headers_mut() = parts.headers.clone();
        res
    }
}
