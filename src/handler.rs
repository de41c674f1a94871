//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A route holds a chain of handlers of *different* concrete types, so the
//! router keeps them behind trait objects (`dyn ErasedHandler`) and stores
//! everything uniformly.
//!
//! ```text
//! async fn load_user(req, res, next) { … }    ← raw middleware, or
//! adapt(list_orders)                          ← value-returning handler
//!        ↓ router.on(Method::GET, "/", h)
//! h.into_boxed_handler()                      ← Handler impls
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req, res, next)  per request   ← one vtable dispatch
//! ```
//!
//! The per-request cost is one `Arc` clone and one virtual call.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::HandlerError;
use crate::next::Next;
use crate::request::Request;
use crate::response::Response;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future driving one handler invocation.
///
/// `Send + 'static` let tokio move the future across threads.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Internal dispatch interface: the host framework's per-request signature.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for everything the router accepts.
///
/// You never implement this yourself. It is satisfied by:
///
/// - [`Adapted`], the output of [`adapt`](crate::adapt) and
///   [`Adapter`](crate::Adapter), and
/// - raw middleware: `async fn name(req: Request, res: Response, next: Next)`.
///   Raw middleware must write to `res` and settle `next` itself.
///
/// The trait is **sealed**: only the impls below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Adapted ───────────────────────────────────────────────────────────────────

/// A wrapped handler with the host framework's signature.
///
/// Cheap to clone. Created once per route registration.
#[derive(Clone)]
pub struct Adapted(BoxedHandler);

impl Adapted {
    pub(crate) fn new(handler: impl ErasedHandler + Send + Sync + 'static) -> Self {
        Self(Arc::new(handler))
    }

    /// Invokes the handler directly, outside a router.
    pub fn call(&self, req: Request, res: Response, next: Next) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.0.call(req, res, next)
    }
}

impl private::Sealed for Adapted {}

impl Handler for Adapted {
    fn into_boxed_handler(self) -> BoxedHandler {
        self.0
    }
}

// ── Raw middleware ────────────────────────────────────────────────────────────

impl<F, Fut> private::Sealed for F
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(Middleware(self))
    }
}

/// Newtype bridging a raw middleware function to [`ErasedHandler`].
///
/// A panic, while calling or while polling, fails the chain with
/// [`HandlerError::Panicked`].
struct Middleware<F>(F);

impl<F, Fut> ErasedHandler for Middleware<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture {
        let channel = next.share();
        match catch_unwind(AssertUnwindSafe(|| (self.0)(req, res, next))) {
            Ok(fut) => Box::pin(async move {
                if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                    channel.fail(HandlerError::from_panic(panic));
                }
            }),
            Err(panic) => {
                channel.fail(HandlerError::from_panic(panic));
                Box::pin(std::future::ready(()))
            }
        }
    }
}
