//! The next-in-chain continuation.
//!
//! A [`Next`] is handed to every handler. It settles at most once: either the
//! chain continues ([`Next::run`]) or the error channel takes over
//! ([`Next::fail`]). Dropping every handle without settling halts the chain
//! with whatever the response already holds.
//!
//! ```text
//! Next::channel()  ──►  (Next, Settlement)
//!        │                    │
//!  handler calls run/fail     router awaits Flow
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::HandlerError;

enum Signal {
    Continue,
    Fail(HandlerError),
}

/// How a handler left the chain.
#[derive(Debug)]
pub enum Flow {
    /// `next.run()` was called.
    Continue,
    /// Every `Next` handle was dropped without a signal.
    Halt,
    /// `next.fail(err)` was called.
    Fail(HandlerError),
}

/// Continuation passed to each handler.
pub struct Next {
    slot: Arc<Mutex<Option<oneshot::Sender<Signal>>>>,
}

/// Receiving half of a [`Next`]. Resolves once the handler settles.
pub struct Settlement(oneshot::Receiver<Signal>);

impl Next {
    /// Creates a continuation and the receiver that observes it.
    ///
    /// The router does this once per handler invocation. It is public so that
    /// handlers can be exercised directly in tests.
    pub fn channel() -> (Next, Settlement) {
        let (tx, rx) = oneshot::channel();
        (Self { slot: Arc::new(Mutex::new(Some(tx))) }, Settlement(rx))
    }

    /// A second handle onto the same slot, kept by the adapter so it can
    /// forward errors after the user function consumed its own handle.
    pub(crate) fn share(&self) -> Next {
        Self { slot: Arc::clone(&self.slot) }
    }

    /// Continue with the next handler in the chain.
    pub fn run(self) {
        self.signal(Signal::Continue);
    }

    /// Escalate to the router's error channel.
    pub fn fail(self, err: impl Into<HandlerError>) {
        self.signal(Signal::Fail(err.into()));
    }

    /// `true` once `run` or `fail` has been called on any handle.
    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }

    fn signal(&self, signal: Signal) {
        let tx = self.slot.lock().take();
        match tx {
            // The receiver is gone only if the router stopped listening.
            Some(tx) => { let _ = tx.send(signal); }
            None => match signal {
                Signal::Fail(err) => warn!(error = %err, "next already settled, dropping error"),
                Signal::Continue  => warn!("next already settled, ignoring continue"),
            },
        }
    }
}

impl Settlement {
    /// Waits for the handler to settle.
    pub async fn flow(self) -> Flow {
        match self.0.await {
            Ok(Signal::Continue) => Flow::Continue,
            Ok(Signal::Fail(err)) => Flow::Fail(err),
            Err(_) => Flow::Halt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_continues() {
        let (next, settlement) = Next::channel();
        next.run();
        assert!(matches!(settlement.flow().await, Flow::Continue));
    }

    #[tokio::test]
    async fn dropping_every_handle_halts() {
        let (next, settlement) = Next::channel();
        let shared = next.share();
        drop(next);
        drop(shared);
        assert!(matches!(settlement.flow().await, Flow::Halt));
    }

    #[tokio::test]
    async fn first_signal_wins() {
        let (next, settlement) = Next::channel();
        let shared = next.share();
        next.fail(HandlerError::Forbidden("first".into()));
        assert!(shared.is_settled());
        shared.run();

        match settlement.flow().await {
            Flow::Fail(HandlerError::Forbidden(msg)) => assert_eq!(msg, "first"),
            other => panic!("unexpected flow: {other:?}"),
        }
    }

    #[tokio::test]
    async fn settling_from_another_task() {
        let (next, settlement) = Next::channel();
        tokio::spawn(async move { next.run() });
        assert!(matches!(settlement.flow().await, Flow::Continue));
    }
}
