//! Request-scoped cancellation.
//!
//! Every store, cache, broker, and catalog call takes a [`RequestContext`] and runs
//! through [`RequestContext::run`], so a canceled caller or an expired deadline
//! surfaces as [`Canceled`] rather than a generic failure.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("operation canceled")]
pub struct Canceled;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no deadline that is only canceled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Ties the context to a token owned by the caller (e.g. a connection's lifetime).
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fails fast when the context is already done. Used before writes.
    pub fn check(&self) -> Result<(), Canceled> {
        if self.is_canceled() {
            Err(Canceled)
        } else {
            Ok(())
        }
    }

    /// Drives `fut` until it completes or the context is canceled, whichever comes first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Canceled>
    where
        F: Future,
    {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Canceled),
            _ = deadline => Err(Canceled),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_not_canceled() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn canceled_token_short_circuits() {
        let ctx = RequestContext::new();
        ctx.cancel();
        assert!(ctx.is_canceled());
        assert_eq!(ctx.check(), Err(Canceled));
        assert_eq!(ctx.run(async { 7 }).await, Err(Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_future() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));
        let slow = tokio::time::sleep(Duration::from_secs(10));
        assert_eq!(ctx.run(slow).await, Err(Canceled));
        assert!(ctx.is_canceled());
    }

    #[tokio::test]
    async fn cancel_during_run_is_observed() {
        let token = CancellationToken::new();
        let ctx = RequestContext::with_token(token.clone());
        let handle = tokio::spawn(async move { ctx.run(std::future::pending::<()>()).await });
        token.cancel();
        assert_eq!(handle.await.unwrap(), Err(Canceled));
    }
}
