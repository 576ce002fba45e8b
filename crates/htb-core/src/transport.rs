//! HTTP transport abstraction and request context.
//!
//! The transport is supplied by the caller (a shared `reqwest::Client` by
//! default). The [`RequestContext`] carries the caller's cancellation token and
//! deadline; every transport call made on behalf of an operation is raced
//! against both.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Request, Response};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

/// Sends a built request and returns the response or a network error.
///
/// Implementations must be safe to share between concurrent callers; the
/// client adds no serialization of its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute the request.
    ///
    /// # Errors
    ///
    /// Returns the transport's own error for DNS, connect, TLS or timeout failures.
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error>;
}

#[async_trait::async_trait]
impl HttpTransport for Client {
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        Client::execute(self, request).await
    }
}

/// Cancellation and deadline scope for API calls.
///
/// Cloning shares the cancellation token, so cancelling any clone cancels all.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Token observed by this context.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns true once the context was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Drive a transport future under this context.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Cancelled`] when the token fires first,
    /// [`TransportError::DeadlineExceeded`] when the deadline passes first and
    /// [`TransportError::Http`] when the future itself fails.
    pub async fn run<F, T>(&self, future: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, reqwest::Error>>,
    {
        if self.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, future)
                    .await
                    .map_err(|_| TransportError::DeadlineExceeded)?
                    .map_err(TransportError::Http),
                None => future.await.map_err(TransportError::Http),
            }
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(TransportError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_passes_through_success() {
        let context = RequestContext::new();
        let value = context.run(async { Ok::<_, reqwest::Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn run_rejects_cancelled_context() {
        let context = RequestContext::new();
        context.cancel();
        let err = context
            .run(async { Ok::<_, reqwest::Error>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[tokio::test]
    async fn run_cancels_in_flight_future() {
        let token = CancellationToken::new();
        let context = RequestContext::new().with_cancellation(token.clone());

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        };
        let pending = context.run(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, reqwest::Error>(())
        });

        let (result, ()) = tokio::join!(pending, canceller);
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn run_enforces_deadline() {
        let context = RequestContext::new().with_timeout(Duration::from_millis(10));
        let err = context
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, reqwest::Error>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::DeadlineExceeded));
    }

    #[test]
    fn clones_share_cancellation() {
        let context = RequestContext::new();
        let clone = context.clone();
        clone.cancel();
        assert!(context.is_cancelled());
    }
}
