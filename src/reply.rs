//! What a wrapped handler may return, and how the adapter reads it.
//!
//! | Returned value                          | Outcome                         |
//! |-----------------------------------------|---------------------------------|
//! | [`HttpResult<T>`]                       | `status(code).json(body)`       |
//! | [`Json<T>`], `Value`, `String`, `&str`, `Bytes`, [`Payload`] | `send(value)` |
//! | `()`, `None`, `Value::Null`, [`Response`] | nothing, already handled      |
//! | `Err(e)`                                | `next.fail(e)`                  |

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;

use crate::error::HandlerError;
use crate::response::{Payload, Response};

/// The classified result of one handler invocation.
#[derive(Debug)]
pub enum Outcome {
    /// Write `body` as JSON with the given status.
    Structured { status: StatusCode, body: serde_json::Value },
    /// Write the value with the generic send operation.
    Send(Payload),
    /// The handler already wrote the response, or deferred to a later one.
    Nothing,
    /// Forward to the error channel.
    Failed(HandlerError),
}

/// Conversion of a handler's return value into an [`Outcome`].
pub trait Reply {
    fn into_outcome(self) -> Outcome;
}

// ── HttpResult ────────────────────────────────────────────────────────────────

/// A value carrying an explicit status code and a body.
///
/// ```rust
/// use tsu_wrap::HttpResult;
///
/// #[derive(serde::Serialize)]
/// struct Order { id: u64 }
///
/// let created = HttpResult::created(Order { id: 1 });
/// assert_eq!(created.status_code().as_u16(), 201);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResult<T> {
    status: StatusCode,
    body: T,
}

impl<T> HttpResult<T> {
    pub fn new(status: StatusCode, body: T) -> Self {
        Self { status, body }
    }

    /// `200 OK`.
    pub fn ok(body: T) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// `201 Created`.
    pub fn created(body: T) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// `202 Accepted`.
    pub fn accepted(body: T) -> Self {
        Self::new(StatusCode::ACCEPTED, body)
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &T { &self.body }
}

impl<T: Serialize> Reply for HttpResult<T> {
    fn into_outcome(self) -> Outcome {
        match serde_json::to_value(&self.body) {
            Ok(body) => Outcome::Structured { status: self.status, body },
            Err(e) => Outcome::Failed(e.into()),
        }
    }
}

// ── Plain values ──────────────────────────────────────────────────────────────

/// Marks a serializable value to be sent as a plain JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Reply for Json<T> {
    fn into_outcome(self) -> Outcome {
        match serde_json::to_value(&self.0) {
            Ok(value) => value.into_outcome(),
            Err(e) => Outcome::Failed(e.into()),
        }
    }
}

impl Reply for serde_json::Value {
    fn into_outcome(self) -> Outcome {
        if self.is_null() {
            Outcome::Nothing
        } else {
            Outcome::Send(Payload::Json(self))
        }
    }
}

impl Reply for String {
    fn into_outcome(self) -> Outcome { Outcome::Send(Payload::Text(self)) }
}

impl Reply for &'static str {
    fn into_outcome(self) -> Outcome { Outcome::Send(Payload::Text(self.to_owned())) }
}

impl Reply for Bytes {
    fn into_outcome(self) -> Outcome { Outcome::Send(Payload::Bytes(self)) }
}

impl Reply for Payload {
    fn into_outcome(self) -> Outcome { Outcome::Send(self) }
}

// ── Nothing to do ─────────────────────────────────────────────────────────────

impl Reply for () {
    fn into_outcome(self) -> Outcome { Outcome::Nothing }
}

/// Returning the response handle itself means it has been written already.
impl Reply for Response {
    fn into_outcome(self) -> Outcome { Outcome::Nothing }
}

impl Reply for Outcome {
    fn into_outcome(self) -> Outcome { self }
}

// ── Wrappers ──────────────────────────────────────────────────────────────────

impl<R: Reply> Reply for Option<R> {
    fn into_outcome(self) -> Outcome {
        self.map_or(Outcome::Nothing, Reply::into_outcome)
    }
}

impl<R: Reply, E: Into<HandlerError>> Reply for Result<R, E> {
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(value) => value.into_outcome(),
            Err(e) => Outcome::Failed(e.into()),
        }
    }
}
