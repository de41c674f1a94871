//! The handler adapter.
//!
//! Wraps a value-returning function into the host signature
//! `(Request, Response, Next)`:
//!
//! ```text
//! f(req, res, next)          ─┐
//! f(ctx, req, res, next)     ─┤ panic while calling  → next.fail(Panicked)
//!                             │ panic while polling  → next.fail(Panicked)
//!                             └ value.into_outcome()
//!                                   Structured       → res.status(s).json(body)
//!                                   Send(v)          → res.send(v)
//!                                   Nothing          → (handled already)
//!                                   Failed(e)        → next.fail(e)
//! ```
//!
//! Injected services are resolved once, in [`Adapter::wrap_with`], and the
//! same instances are handed to every request.

use std::any::type_name;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::error::{ConfigError, HandlerError};
use crate::handler::{Adapted, BoxFuture, ErasedHandler};
use crate::next::Next;
use crate::reply::{Outcome, Reply};
use crate::request::Request;
use crate::response::Response;
use crate::service::{Inject, ServiceLocator};

/// Wraps `f` without service injection.
///
/// ```rust
/// use tsu_wrap::{adapt, Json, Next, Request, Response};
///
/// let handler = adapt(|req: Request, _res: Response, _next: Next| async move {
///     Json(serde_json::json!({ "path": req.path() }))
/// });
/// # let _ = handler;
/// ```
pub fn adapt<F, Fut, R>(f: F) -> Adapted
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Reply + Send + 'static,
{
    Adapted::new(Plain(f))
}

/// Builds adapted handlers, optionally backed by a [`ServiceLocator`].
#[derive(Clone, Default)]
pub struct Adapter {
    locator: Option<Arc<dyn ServiceLocator>>,
}

impl Adapter {
    /// An adapter that resolves services through `locator`.
    pub fn new(locator: impl ServiceLocator + 'static) -> Self {
        Self { locator: Some(Arc::new(locator)) }
    }

    /// An adapter with no locator. [`wrap`](Self::wrap) works;
    /// [`wrap_with`](Self::wrap_with) fails with
    /// [`ConfigError::ProviderUnavailable`].
    pub fn detached() -> Self {
        Self::default()
    }

    /// Same as [`adapt`].
    pub fn wrap<F, Fut, R>(&self, f: F) -> Adapted
    where
        F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Reply + Send + 'static,
    {
        adapt(f)
    }

    /// Wraps `f`, resolving its service context `C` now.
    ///
    /// `C` is usually inferred from `f`'s first parameter, e.g.
    /// `(Arc<Orders>, Arc<Mailer>)`. Resolution happens exactly once; every
    /// request receives a clone of the same context.
    pub fn wrap_with<C, F, Fut, R>(&self, f: F) -> Result<Adapted, ConfigError>
    where
        C: Inject,
        F: Fn(C, Request, Response, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Reply + Send + 'static,
    {
        let locator = self.locator.as_deref().ok_or(ConfigError::ProviderUnavailable)?;
        let ctx = C::inject(locator)?;

        let mut services = Vec::new();
        C::describe(&mut services);
        debug!(handler = type_name::<F>(), ?services, "resolved injected services");

        Ok(Adapted::new(Injected { ctx, f }))
    }
}

// ── Wrappers ──────────────────────────────────────────────────────────────────

struct Plain<F>(F);

impl<F, Fut, R> ErasedHandler for Plain<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: Reply + Send + 'static,
{
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture {
        let channel = next.share();
        let invoked = catch_unwind(AssertUnwindSafe(|| (self.0)(req, res.clone(), next)));
        settle(invoked, res, channel)
    }
}

struct Injected<C, F> {
    ctx: C,
    f: F,
}

impl<C, F, Fut, R> ErasedHandler for Injected<C, F>
where
    C: Inject,
    F: Fn(C, Request, Response, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: Reply + Send + 'static,
{
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture {
        let channel = next.share();
        let invoked = catch_unwind(AssertUnwindSafe(|| {
            (self.f)(self.ctx.clone(), req, res.clone(), next)
        }));
        settle(invoked, res, channel)
    }
}

// ── Result handling ───────────────────────────────────────────────────────────

/// Drives the user future and applies its outcome.
///
/// `channel` shares the slot of the `Next` the user function received, so an
/// error can be forwarded even after the user consumed its own handle.
fn settle<Fut, R>(invoked: std::thread::Result<Fut>, res: Response, channel: Next) -> BoxFuture
where
    Fut: Future<Output = R> + Send + 'static,
    R: Reply + Send + 'static,
{
    let fut = match invoked {
        Ok(fut) => fut,
        Err(panic) => {
            // Synchronous failure: forwarded before any future exists.
            channel.fail(HandlerError::from_panic(panic));
            return Box::pin(std::future::ready(()));
        }
    };

    Box::pin(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(value) => apply(value.into_outcome(), &res, channel),
            Err(panic) => channel.fail(HandlerError::from_panic(panic)),
        }
    })
}

fn apply(outcome: Outcome, res: &Response, channel: Next) {
    match outcome {
        Outcome::Structured { status, body } => {
            if let Err(e) = res.status(status).json(&body) {
                channel.fail(e);
            }
        }
        Outcome::Send(payload) => res.send(payload),
        Outcome::Nothing => {}
        Outcome::Failed(e) => channel.fail(e),
    }
}
