use std::sync::Arc;

use ferrix_core::{InferRequest, InferResponse};
use tracing::{debug, info};

use super::handler::Handler;
use super::types::{HookRole, Postprocessor, Preprocessor, TransformError};

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Errors from binding or resolving hooks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a {role} is already registered for this handler")]
    DuplicateRegistration { role: HookRole },
    #[error("no {role} is registered")]
    UnregisteredRole { role: HookRole },
}

// ---------------------------------------------------------------------------
// RegisteredHook
// ---------------------------------------------------------------------------

/// A hook tagged with the role it is registered under.
///
/// The variant fixes the signature: a preprocessor maps requests to requests,
/// a postprocessor maps responses to responses.
#[derive(Clone)]
pub enum RegisteredHook {
    Preprocessor(Preprocessor),
    Postprocessor(Postprocessor),
}

impl RegisteredHook {
    #[must_use]
    pub fn role(&self) -> HookRole {
        match self {
            RegisteredHook::Preprocessor(_) => HookRole::Preprocessor,
            RegisteredHook::Postprocessor(_) => HookRole::Postprocessor,
        }
    }
}

impl std::fmt::Debug for RegisteredHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RegisteredHook").field(&self.role()).finish()
    }
}

// ---------------------------------------------------------------------------
// HookRegistryBuilder
// ---------------------------------------------------------------------------

/// Load-time side of the registry: collects at most one hook per role.
///
/// A second registration for a role already bound fails with
/// [`RegistryError::DuplicateRegistration`] and keeps the first binding.
pub struct HookRegistryBuilder {
    handler: String,
    preprocessor: Option<Preprocessor>,
    postprocessor: Option<Postprocessor>,
}

impl HookRegistryBuilder {
    /// Creates an empty builder for the named handler.
    #[must_use]
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            preprocessor: None,
            postprocessor: None,
        }
    }

    /// Binds `hook` under its role.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if the role is
    /// already bound.
    pub fn register(&mut self, hook: RegisteredHook) -> Result<&mut Self, RegistryError> {
        let role = hook.role();
        match hook {
            RegisteredHook::Preprocessor(f) => bind(&mut self.preprocessor, f, role)?,
            RegisteredHook::Postprocessor(f) => bind(&mut self.postprocessor, f, role)?,
        }
        debug!(handler = %self.handler, role = %role, "hook registered");
        Ok(self)
    }

    /// Binds a request transform as the preprocessor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if a preprocessor is
    /// already bound.
    pub fn preprocessor<F>(&mut self, f: F) -> Result<&mut Self, RegistryError>
    where
        F: Fn(InferRequest) -> Result<InferRequest, TransformError> + Send + Sync + 'static,
    {
        self.register(RegisteredHook::Preprocessor(Arc::new(f)))
    }

    /// Binds a response transform as the postprocessor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if a postprocessor is
    /// already bound.
    pub fn postprocessor<F>(&mut self, f: F) -> Result<&mut Self, RegistryError>
    where
        F: Fn(InferResponse) -> Result<InferResponse, TransformError> + Send + Sync + 'static,
    {
        self.register(RegisteredHook::Postprocessor(Arc::new(f)))
    }

    /// Freezes the bindings. The result is read-only for the rest of the process.
    #[must_use]
    pub fn build(self) -> HookRegistry {
        HookRegistry {
            handler: self.handler,
            preprocessor: self.preprocessor,
            postprocessor: self.postprocessor,
        }
    }
}

impl Default for HookRegistryBuilder {
    fn default() -> Self {
        Self::new("anonymous")
    }
}

fn bind<T>(slot: &mut Option<T>, hook: T, role: HookRole) -> Result<(), RegistryError> {
    if slot.is_some() {
        return Err(RegistryError::DuplicateRegistration { role });
    }
    *slot = Some(hook);
    Ok(())
}

// ---------------------------------------------------------------------------
// HookRegistry
// ---------------------------------------------------------------------------

/// Frozen role -> hook table for one handler.
///
/// Built once at startup and shared behind an `Arc`; lookups take no locks.
pub struct HookRegistry {
    handler: String,
    preprocessor: Option<Preprocessor>,
    postprocessor: Option<Postprocessor>,
}

impl HookRegistry {
    #[must_use]
    pub fn builder(handler: impl Into<String>) -> HookRegistryBuilder {
        HookRegistryBuilder::new(handler)
    }

    /// Runs the handler's registration and freezes the result.
    ///
    /// # Errors
    ///
    /// Propagates any [`RegistryError`] raised during registration.
    pub fn load(handler: &dyn Handler) -> Result<Self, RegistryError> {
        let mut builder = HookRegistryBuilder::new(handler.name());
        handler.register(&mut builder)?;
        let registry = builder.build();

        let roles: Vec<&str> = registry.roles().into_iter().map(HookRole::as_str).collect();
        info!(handler = %registry.handler, roles = ?roles, "handler loaded");
        Ok(registry)
    }

    /// Name of the handler whose hooks this registry holds.
    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler
    }

    /// Resolves the preprocessor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnregisteredRole`] if none was bound.
    pub fn preprocessor(&self) -> Result<&Preprocessor, RegistryError> {
        self.preprocessor
            .as_ref()
            .ok_or(RegistryError::UnregisteredRole {
                role: HookRole::Preprocessor,
            })
    }

    /// Resolves the postprocessor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnregisteredRole`] if none was bound.
    pub fn postprocessor(&self) -> Result<&Postprocessor, RegistryError> {
        self.postprocessor
            .as_ref()
            .ok_or(RegistryError::UnregisteredRole {
                role: HookRole::Postprocessor,
            })
    }

    /// Resolves either role as a tagged hook.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnregisteredRole`] if `role` was never bound.
    pub fn resolve(&self, role: HookRole) -> Result<RegisteredHook, RegistryError> {
        match role {
            HookRole::Preprocessor => self
                .preprocessor()
                .map(|f| RegisteredHook::Preprocessor(Arc::clone(f))),
            HookRole::Postprocessor => self
                .postprocessor()
                .map(|f| RegisteredHook::Postprocessor(Arc::clone(f))),
        }
    }

    #[must_use]
    pub fn is_registered(&self, role: HookRole) -> bool {
        match role {
            HookRole::Preprocessor => self.preprocessor.is_some(),
            HookRole::Postprocessor => self.postprocessor.is_some(),
        }
    }

    /// Roles with a bound hook, in pipeline order.
    #[must_use]
    pub fn roles(&self) -> Vec<HookRole> {
        HookRole::ALL
            .into_iter()
            .filter(|role| self.is_registered(*role))
            .collect()
    }
}

impl std::fmt::Debug for HookRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistryBuilder")
            .field("handler", &self.handler)
            .field("preprocessor", &self.preprocessor.is_some())
            .field("postprocessor", &self.postprocessor.is_some())
            .finish()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("handler", &self.handler)
            .field("roles", &self.roles())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
