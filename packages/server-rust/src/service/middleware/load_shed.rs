//! Load shedding for inference requests.
//!
//! Rejects a request with `InvocationError::Overloaded` when
//! `max_concurrent_requests` invocations are already in flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use ferrix_core::{InferRequest, InferResponse};
use tokio::sync::Semaphore;
use tower::{Layer, Service};

use crate::service::error::InvocationError;

// ---------------------------------------------------------------------------
// LoadShedLayer
// ---------------------------------------------------------------------------

/// Caps concurrent invocations with a semaphore. Excess requests fail at once
/// instead of queueing behind a busy engine.
#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    permits: Arc<Semaphore>,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }

    /// Permits currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            permits: Arc::clone(&self.permits),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadShedService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    permits: Arc<Semaphore>,
}

impl<S> Service<InferRequest> for LoadShedService<S>
where
    S: Service<InferRequest, Response = InferResponse, Error = InvocationError> + Send,
    S::Future: Send + 'static,
{
    type Response = InferResponse;
    type Error = InvocationError;
    type Future = Pin<Box<dyn Future<Output = Result<InferResponse, InvocationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: InferRequest) -> Self::Future {
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            tracing::warn!(id = %request.id, "shedding request, server at capacity");
            return Box::pin(async { Err(InvocationError::Overloaded) });
        };

        let fut = self.inner.call(request);
        Box::pin(async move {
            let _permit = permit;
            fut.await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tower::ServiceExt;

    use super::*;

    /// Answers after a fixed delay.
    #[derive(Clone)]
    struct Sleepy {
        delay: Duration,
    }

    impl Service<InferRequest> for Sleepy {
        type Response = InferResponse;
        type Error = InvocationError;
        type Future =
            Pin<Box<dyn Future<Output = Result<InferResponse, InvocationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: InferRequest) -> Self::Future {
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(InferResponse::answering(&request))
            })
        }
    }

    #[tokio::test]
    async fn passes_requests_under_the_limit() {
        let svc = LoadShedLayer::new(4).layer(Sleepy {
            delay: Duration::from_millis(1),
        });
        let resp = svc.oneshot(InferRequest::new("a")).await.unwrap();
        assert_eq!(resp.id, "a");
    }

    #[tokio::test]
    async fn sheds_when_all_permits_are_taken() {
        let layer = LoadShedLayer::new(1);
        let mut svc = layer.layer(Sleepy {
            delay: Duration::from_millis(500),
        });

        let first = svc.call(InferRequest::new("first"));
        let in_flight = tokio::spawn(first);
        assert_eq!(layer.available(), 0);

        let err = svc.call(InferRequest::new("second")).await.unwrap_err();
        assert!(matches!(err, InvocationError::Overloaded));

        in_flight.await.unwrap().unwrap();
        assert_eq!(layer.available(), 1);
    }
}
