//! Per-operation cancellation and deadline handling.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;

/// Cancellation signal and optional deadline passed into every record operation.
///
/// Cloning shares the underlying [`CancellationToken`], so cancelling any clone
/// aborts every operation running under it.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::default().deadline_in(timeout)
    }

    /// A context driven by an externally owned cancellation token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Set (or tighten) the deadline to `timeout` from now.
    pub fn deadline_in(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(candidate),
            None => candidate,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail fast if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        if matches!(self.remaining(), Some(left) if left.is_zero()) {
            return Err(CoreError::Timeout);
        }
        Ok(())
    }

    /// Poll `future` until it completes, the context is cancelled, or the
    /// deadline passes.
    ///
    /// The future is dropped on abort, so this must only wrap work that is
    /// safe to abandon midway (reads, backoff sleeps). Writes run outside it.
    pub async fn race<F: Future>(&self, future: F) -> Result<F::Output, CoreError> {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CoreError::Cancelled),
            _ = deadline => Err(CoreError::Timeout),
            output = future => Ok(output),
        }
    }

    /// Drive a fallible read-only `operation` under [`OpContext::race`].
    pub async fn run<T, F>(&self, operation: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        self.race(operation).await?
    }
}
