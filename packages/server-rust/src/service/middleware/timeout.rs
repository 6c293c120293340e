//! Host-side invocation timeout.
//!
//! The contract itself never times out; this layer bounds the whole
//! preprocess -> infer -> postprocess run and fails with
//! `InvocationError::Timeout` when it takes longer than configured.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use ferrix_core::{InferRequest, InferResponse};
use tower::{Layer, Service};

use crate::service::error::InvocationError;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    timeout: Duration,
}

impl<S> Service<InferRequest> for TimeoutService<S>
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
        let timeout = self.timeout;
        let fut = self.inner.call(request);
        Box::pin(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(InvocationError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;

    struct Delayed(Duration);

    impl Service<InferRequest> for Delayed {
        type Response = InferResponse;
        type Error = InvocationError;
        type Future =
            Pin<Box<dyn Future<Output = Result<InferResponse, InvocationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: InferRequest) -> Self::Future {
            let delay = self.0;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(InferResponse::answering(&request))
            })
        }
    }

    #[tokio::test]
    async fn completes_within_timeout() {
        let svc = TimeoutLayer::new(Duration::from_secs(1)).layer(Delayed(Duration::from_millis(5)));
        let resp = svc.oneshot(InferRequest::new("quick")).await.unwrap();
        assert_eq!(resp.id, "quick");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_invocation_times_out() {
        let svc =
            TimeoutLayer::new(Duration::from_millis(50)).layer(Delayed(Duration::from_secs(10)));
        let err = svc.oneshot(InferRequest::new("slow")).await.unwrap_err();
        assert!(matches!(err, InvocationError::Timeout { timeout_ms: 50 }));
    }
}
