//! Per-operation context.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::errors::{StoreError, StoreErrorKind};

/// Execution context threaded through every storage operation.
///
/// Carries a cooperative cancellation token and an optional deadline.
/// Filesystem syscalls cannot be interrupted once issued, so backends check
/// the context between steps and race only the interruptible parts
/// (reading caller input) against it.
#[derive(Clone, Debug, Default)]
pub struct StoreCtx {
    /// Cancellation token for cooperative cancellation
    pub cancel_token: CancellationToken,

    /// Deadline for this operation, if any
    pub deadline: Option<Instant>,
}

impl StoreCtx {
    /// Context that never cancels and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn new(cancel_token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            cancel_token,
            deadline,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn is_timeout(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails fast if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            return Err(StoreErrorKind::Cancelled.into());
        }
        if self.is_timeout() {
            return Err(StoreErrorKind::DeadlineExceeded.into());
        }
        Ok(())
    }

    /// Runs `fut` until it completes, the token is cancelled, or the deadline
    /// passes, whichever comes first.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.check()?;
        let deadline = self.deadline.map(tokio::time::Instant::from_std);
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(StoreErrorKind::Cancelled.into()),
            _ = sleep_until(deadline) => Err(StoreErrorKind::DeadlineExceeded.into()),
            out = fut => out,
        }
    }
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
