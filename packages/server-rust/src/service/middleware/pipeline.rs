use std::time::Duration;

use ferrix_core::{InferRequest, InferResponse};
use tower::util::BoxCloneSyncService;
use tower::ServiceBuilder;

use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use super::timeout::TimeoutLayer;
use crate::service::config::ServerConfig;
use crate::service::error::InvocationError;
use crate::service::invocation::InferenceService;

/// The fully layered invocation service handed to the transport.
pub type InvocationPipeline = BoxCloneSyncService<InferRequest, InferResponse, InvocationError>;

/// Wraps the `InferenceService` with the host middleware.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded, before any work
/// 2. `TimeoutLayer` -- bound the whole invocation; a transform already on
///    the blocking pool runs to completion and keeps its slot
/// 3. `MetricsLayer` -- span, outcome and latency, closest to the contract
#[must_use]
pub fn build_invocation_pipeline(
    service: InferenceService,
    config: &ServerConfig,
) -> InvocationPipeline {
    let svc = ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_requests))
        .layer(TimeoutLayer::new(Duration::from_millis(config.request_timeout_ms)))
        .layer(MetricsLayer)
        .service(service);
    BoxCloneSyncService::new(svc)
}
