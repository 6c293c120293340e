use std::fmt;
use std::sync::Arc;

use ferrix_core::{EnvelopeError, InferRequest, InferResponse, SchemaError};

// ---------------------------------------------------------------------------
// HookRole
// ---------------------------------------------------------------------------

/// Pipeline stage a registered transform fulfills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookRole {
    /// Runs on the inbound request before the engine.
    Preprocessor,
    /// Runs on the response built from the engine's raw outputs.
    Postprocessor,
}

impl HookRole {
    pub const ALL: [HookRole; 2] = [HookRole::Preprocessor, HookRole::Postprocessor];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HookRole::Preprocessor => "preprocessor",
            HookRole::Postprocessor => "postprocessor",
        }
    }
}

impl fmt::Display for HookRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TransformError
// ---------------------------------------------------------------------------

/// Failure raised by a user-supplied transform body.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransformError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransformError {
    /// A failure described only by a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A failure caused by another error; the message is taken from it.
    #[must_use]
    pub fn caused_by<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SchemaError> for TransformError {
    fn from(err: SchemaError) -> Self {
        Self::caused_by(err)
    }
}

impl From<EnvelopeError> for TransformError {
    fn from(err: EnvelopeError) -> Self {
        Self::caused_by(err)
    }
}

impl From<std::io::Error> for TransformError {
    fn from(err: std::io::Error) -> Self {
        Self::caused_by(err)
    }
}

impl From<anyhow::Error> for TransformError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
            source: Some(err.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Hook trait
// ---------------------------------------------------------------------------

/// A user transform over one envelope type.
///
/// Implementations must not keep mutable state shared between calls: the
/// host invokes the same hook concurrently for unrelated requests. Any
/// `Fn(E) -> Result<E, TransformError>` closure or function is a hook.
pub trait Hook<E>: Send + Sync {
    /// Transforms one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] if the transform cannot produce an envelope;
    /// the host aborts the request.
    fn apply(&self, envelope: E) -> Result<E, TransformError>;
}

impl<E, F> Hook<E> for F
where
    F: Fn(E) -> Result<E, TransformError> + Send + Sync,
{
    fn apply(&self, envelope: E) -> Result<E, TransformError> {
        self(envelope)
    }
}

/// Request transform bound to [`HookRole::Preprocessor`].
pub type Preprocessor = Arc<dyn Hook<InferRequest>>;

/// Response transform bound to [`HookRole::Postprocessor`].
pub type Postprocessor = Arc<dyn Hook<InferResponse>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names() {
        assert_eq!(HookRole::Preprocessor.to_string(), "preprocessor");
        assert_eq!(HookRole::Postprocessor.as_str(), "postprocessor");
    }

    #[test]
    fn closures_are_hooks() {
        let hook = |mut req: InferRequest| -> Result<InferRequest, TransformError> {
            req.id.push_str("-seen");
            Ok(req)
        };
        let out = Hook::apply(&hook, InferRequest::new("a")).unwrap();
        assert_eq!(out.id, "a-seen");
    }

    #[test]
    fn envelope_errors_convert_with_message() {
        let err: TransformError = EnvelopeError::MissingParameter {
            key: "image".to_string(),
        }
        .into();
        assert_eq!(err.message(), "missing request parameter `image`");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn anyhow_errors_keep_their_chain() {
        let err: TransformError = anyhow::anyhow!("decode failed")
            .context("cannot open image")
            .into();
        assert_eq!(err.message(), "cannot open image: decode failed");
    }
}
