//! Error types.
//!
//! Three families, split by when they surface:
//!
//! - [`ConfigError`]: raised while the application is being assembled
//!   (resolving injected services, reading the environment). Fatal to that
//!   route's setup; never seen at request time.
//! - [`HandlerError`]: raised while a request is being handled. Always routed
//!   through the router's error channel, exactly once.
//! - [`Error`]: infrastructure failures from [`Server::serve`](crate::Server::serve).

use std::any::Any;

use http::StatusCode;
use thiserror::Error;

/// Boxed error accepted by [`HandlerError::Internal`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by tsu-wrap's server operations.
///
/// Application-level failures are [`HandlerError`]s. This type surfaces
/// infrastructure failures: binding to a port or accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Wrap-time and startup configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Services were requested from an [`Adapter`](crate::Adapter) that has
    /// no [`ServiceLocator`](crate::ServiceLocator) attached.
    #[error("no service locator configured, services cannot be resolved")]
    ProviderUnavailable,

    /// The locator has no registration for the requested service type.
    #[error("service `{service}` is not registered")]
    Unresolved { service: &'static str },

    /// An environment variable was present but could not be parsed.
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Request-time failures, forwarded to the router's error channel.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Internal(BoxError),
}

impl HandlerError {
    /// Wraps any error as [`HandlerError::Internal`].
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }

    /// HTTP status the default error handler answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Panicked(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable tag, used as the `error` field of error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Panicked(_) => "panicked",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }

    /// Converts a caught panic payload into [`HandlerError::Panicked`].
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self::Panicked(msg)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

impl From<ConfigError> for HandlerError {
    fn from(e: ConfigError) -> Self {
        Self::Internal(Box::new(e))
    }
}
