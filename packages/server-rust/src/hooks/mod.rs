//! Handler hooks: the user extension points around model execution.
//!
//! A [`Handler`] binds at most one [`Hook`] per [`HookRole`] into a
//! [`HookRegistryBuilder`] at load time. The builder freezes into a
//! [`HookRegistry`] that request tasks read concurrently without locking.

pub mod handler;
pub mod registry;
pub mod types;

pub use handler::{Handler, PassThroughHandler};
pub use registry::{HookRegistry, HookRegistryBuilder, RegisteredHook, RegistryError};
pub use types::{Hook, HookRole, Postprocessor, Preprocessor, TransformError};
