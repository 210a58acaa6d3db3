//! Request context carrying the provider stop signal
//!
//! Every RPC hands resources and data sources a clone of the server's
//! context. StopProvider cancels it, letting long-running work (such as
//! paginated reads) bail out early.

use std::sync::Arc;
use tokio::sync::watch;

/// Context is cheap to clone; all clones observe the same cancellation
/// Pass this as the first parameter to all async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner { done, done_tx }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        // the sender lives in `inner`, so wait_for only errors once every clone is gone
        let _ = done.wait_for(|stopped| *stopped).await;
    }

    pub fn cancel(&self) {
        self.inner.done_tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_is_visible_to_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();

        assert!(!clone.is_cancelled());
        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let ctx = Context::new();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        ctx.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancelled() should resolve")
            .unwrap();
    }

    #[test]
    fn already_cancelled_resolves_immediately() {
        let ctx = Context::new();
        ctx.cancel();
        tokio_test::block_on(ctx.cancelled());
        assert!(ctx.is_cancelled());
    }
}
