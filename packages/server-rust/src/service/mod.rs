//! Request execution: the invocation contract and the host middleware around it.
//!
//! 1. **Invocation** (`invocation`): preprocess -> infer -> postprocess
//! 2. **Middleware** (`middleware`): Tower layers (load shedding, timeout, metrics)
//! 3. **Errors** (`error`): the single failed-request outcome and its stages
//! 4. **Config** (`config`): service settings and the TOML model config

pub mod config;
pub mod error;
pub mod invocation;
pub mod middleware;

pub use config::{ConfigError, MissingHookPolicy, ModelConfig, ServerConfig};
pub use error::{InvocationError, InvocationStage};
pub use invocation::InferenceService;
pub use middleware::{build_invocation_pipeline, InvocationPipeline};
