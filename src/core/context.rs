use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::errors::AppError;

/// Per-request cancellation scope threaded through every service operation.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        RequestContext {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Shares the caller's token so cancelling it aborts this context too.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drives `operation` until it finishes, the token fires, or the deadline passes.
    /// An already cancelled or expired context never polls `operation`.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled("cancelled by caller"));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(AppError::Cancelled("deadline exceeded"));
        }
        let deadline = self.deadline;
        let bounded = async move {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, operation)
                    .await
                    .map_err(|_| AppError::Cancelled("deadline exceeded"))?,
                None => operation.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::Cancelled("cancelled by caller")),
            result = bounded => result,
        }
    }
}
