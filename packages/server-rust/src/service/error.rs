use std::fmt;

use ferrix_core::{CodecError, SchemaError};

use crate::hooks::{HookRole, RegistryError, TransformError};

// ---------------------------------------------------------------------------
// InvocationStage
// ---------------------------------------------------------------------------

/// Per-request state. Transitions only move forward; nothing is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvocationStage {
    Received,
    Preprocessed,
    Inferred,
    /// Terminal.
    Postprocessed,
}

impl InvocationStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InvocationStage::Received => "received",
            InvocationStage::Preprocessed => "preprocessed",
            InvocationStage::Inferred => "inferred",
            InvocationStage::Postprocessed => "postprocessed",
        }
    }

    /// The stage that follows this one, or `None` at the terminal stage.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            InvocationStage::Received => Some(InvocationStage::Preprocessed),
            InvocationStage::Preprocessed => Some(InvocationStage::Inferred),
            InvocationStage::Inferred => Some(InvocationStage::Postprocessed),
            InvocationStage::Postprocessed => None,
        }
    }
}

impl fmt::Display for InvocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InvocationError
// ---------------------------------------------------------------------------

/// The single failed-request outcome surfaced to the transport.
///
/// Every variant aborts the request; none is retried.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// The engine returned outputs that do not form valid descriptors.
    #[error("invalid engine output: {0}")]
    EngineOutput(#[from] SchemaError),
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("failed to encode response: {0}")]
    Encode(#[source] CodecError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{role} failed: {source}")]
    Transform {
        role: HookRole,
        #[source]
        source: TransformError,
    },
    #[error("engine failed: {0:#}")]
    Engine(#[source] anyhow::Error),
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("unknown model: {name}")]
    ModelNotFound { name: String },
    #[error("model {name} is not ready")]
    NotReady { name: String },
}

impl InvocationError {
    /// Stable snake-case tag for logs, metrics and error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            InvocationError::EngineOutput(_) => "engine_output_error",
            InvocationError::Decode(_) => "decode_error",
            InvocationError::Encode(_) => "encode_error",
            InvocationError::Registry(RegistryError::UnregisteredRole { .. }) => {
                "unregistered_role"
            }
            InvocationError::Registry(RegistryError::DuplicateRegistration { .. }) => {
                "duplicate_registration"
            }
            InvocationError::Transform { .. } => "transform_error",
            InvocationError::Engine(_) => "engine_error",
            InvocationError::Timeout { .. } => "timeout",
            InvocationError::Overloaded => "overloaded",
            InvocationError::ModelNotFound { .. } => "model_not_found",
            InvocationError::NotReady { .. } => "not_ready",
        }
    }

    pub(crate) fn transform(role: HookRole, source: TransformError) -> Self {
        InvocationError::Transform { role, source }
    }
}
