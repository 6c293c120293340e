//! HTTP handlers and the state they share.

pub mod error;
pub mod health;
pub mod infer;
pub mod metadata;
pub mod metrics;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use infer::infer_handler;
pub use metadata::{model_metadata_handler, model_ready_handler, server_metadata_handler};
pub use metrics::metrics_handler;

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;

use super::ShutdownController;
use crate::service::{InferenceService, InvocationPipeline};

/// State carried through axum's `State` extractor. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The layered invocation stack requests are sent through.
    pub pipeline: InvocationPipeline,
    /// The bare service, for identity and readiness queries.
    pub service: InferenceService,
    pub shutdown: Arc<ShutdownController>,
    pub start_time: Instant,
    /// Present when a Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}
