//! Tower middleware around the invocation contract.
//!
//! - [`load_shed`]: semaphore-based concurrency limiting
//! - [`timeout`]: host-side invocation timeout
//! - [`metrics`]: tracing span plus request counter and latency histogram
//! - [`pipeline`]: composes the layers around an `InferenceService`

pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use load_shed::LoadShedLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_invocation_pipeline, InvocationPipeline};
pub use timeout::TimeoutLayer;
