//! Per-request instrumentation.
//!
//! Opens a `tracing` span for every invocation (the service records the
//! current stage on it) and feeds the `metrics` facade. Without an installed
//! recorder the metric calls are no-ops.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use ferrix_core::{InferRequest, InferResponse};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::error::InvocationError;

/// Counter of finished requests, labelled by `outcome` (`ok` or an error kind).
pub const REQUESTS_TOTAL: &str = "ferrix_requests_total";

/// Histogram of end-to-end invocation latency in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "ferrix_request_duration_seconds";

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<InferRequest> for MetricsService<S>
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
        let span = info_span!(
            "invocation",
            id = %request.id,
            model = request.model_name.as_deref().unwrap_or_default(),
            stage = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(request);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(err) => err.kind(),
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                let span = tracing::Span::current();
                span.record("duration_ms", duration_ms);
                span.record("outcome", outcome);

                metrics::counter!(REQUESTS_TOTAL, "outcome" => outcome).increment(1);
                metrics::histogram!(REQUEST_DURATION_SECONDS).record(elapsed.as_secs_f64());

                match &result {
                    Ok(_) => tracing::info!(duration_ms, outcome, "invocation complete"),
                    Err(err) => tracing::warn!(duration_ms, outcome, error = %err, "invocation failed"),
                }

                result
            }
            .instrument(span),
        )
    }
}
