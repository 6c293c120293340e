use ferrix_core::{InferRequest, InferResponse};

use super::registry::{HookRegistryBuilder, RegistryError};
use super::types::TransformError;

/// User code that supplies the transforms for one model.
///
/// The host calls [`Handler::register`] exactly once, at load time, before
/// any request is served (see `HookRegistry::load`).
pub trait Handler: Send + Sync {
    /// Name reported in logs and model metadata.
    fn name(&self) -> &str;

    /// Binds this handler's hooks.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if a role is bound twice.
    fn register(&self, hooks: &mut HookRegistryBuilder) -> Result<(), RegistryError>;
}

/// Binds identity transforms for both roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughHandler;

impl Handler for PassThroughHandler {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn register(&self, hooks: &mut HookRegistryBuilder) -> Result<(), RegistryError> {
        hooks
            .preprocessor(identity_request)?
            .postprocessor(identity_response)?;
        Ok(())
    }
}

fn identity_request(request: InferRequest) -> Result<InferRequest, TransformError> {
    Ok(request)
}

fn identity_response(response: InferResponse) -> Result<InferResponse, TransformError> {
    Ok(response)
}
