//! Ferrix Server: handler hooks, the invocation contract, and an HTTP host.
//!
//! A [`hooks::Handler`] binds a preprocessor and a postprocessor into a frozen
//! [`hooks::HookRegistry`]. The [`service::InferenceService`] drives each
//! request through preprocess -> [`traits::InferenceEngine`] -> postprocess,
//! and [`network::NetworkModule`] serves it over HTTP.

pub mod engines;
pub mod hooks;
pub mod network;
pub mod service;
pub mod traits;

pub use hooks::{Handler, HookRegistry, HookRegistryBuilder, HookRole, TransformError};
pub use service::{InferenceService, InvocationError, ServerConfig};
pub use traits::{InferenceEngine, RawOutput};
