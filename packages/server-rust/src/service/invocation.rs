//! The invocation contract: preprocess -> infer -> postprocess.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use ferrix_core::{InferRequest, InferResponse, OutputDescriptor};
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tower::Service;
use tracing::debug;

use super::config::{MissingHookPolicy, ServerConfig};
use super::error::{InvocationError, InvocationStage};
use crate::hooks::{Hook, HookRegistry, HookRole, RegistryError, TransformError};
use crate::traits::{InferenceEngine, RawOutput};

struct Inner {
    registry: Arc<HookRegistry>,
    engine: Arc<dyn InferenceEngine>,
    config: ServerConfig,
    /// Bounds transforms on the blocking pool, including ones whose request
    /// has already timed out.
    transform_slots: Arc<Semaphore>,
}

/// Drives one request through the handler's hooks and the engine.
///
/// Cheap to clone; clones share the frozen registry and the engine, so any
/// number of requests may be invoked concurrently.
#[derive(Clone)]
pub struct InferenceService {
    inner: Arc<Inner>,
}

impl InferenceService {
    #[must_use]
    pub fn new(
        registry: Arc<HookRegistry>,
        engine: Arc<dyn InferenceEngine>,
        config: ServerConfig,
    ) -> Self {
        let transform_slots = Arc::new(Semaphore::new(config.max_concurrent_requests as usize));
        Self {
            inner: Arc::new(Inner {
                registry,
                engine,
                config,
                transform_slots,
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn engine(&self) -> &dyn InferenceEngine {
        self.inner.engine.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.inner.config.model_name
    }

    /// Whether `name` addresses the model this service hosts.
    #[must_use]
    pub fn serves(&self, name: &str) -> bool {
        name == self.inner.config.model_name
    }

    /// Whether the engine has finished loading.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.engine.loaded()
    }

    /// Loads the engine's model.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::Engine`] if the engine fails to load.
    pub async fn load_engine(&self) -> Result<(), InvocationError> {
        self.inner
            .engine
            .load()
            .await
            .map_err(InvocationError::Engine)?;
        tracing::info!(
            model = %self.model_name(),
            platform = self.inner.engine.platform(),
            "model loaded"
        );
        Ok(())
    }

    /// Runs the full contract for one request.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError`] on the first failing transition; later
    /// stages are not attempted.
    pub async fn invoke(&self, mut request: InferRequest) -> Result<InferResponse, InvocationError> {
        let config = &self.inner.config;
        match request.model_name.as_deref() {
            Some(name) if name != config.model_name => {
                return Err(InvocationError::ModelNotFound {
                    name: name.to_string(),
                });
            }
            Some(_) => {}
            None => request.model_name = Some(config.model_name.clone()),
        }
        if request.model_version.is_none() {
            request.model_version.clone_from(&config.model_version);
        }
        if !self.is_ready() {
            return Err(InvocationError::NotReady {
                name: config.model_name.clone(),
            });
        }
        enter(InvocationStage::Received, &request.id);

        let request = match self.hook::<InferRequest>(HookRole::Preprocessor)? {
            Some(hook) => self.run_blocking(HookRole::Preprocessor, hook, request).await?,
            None => request,
        };
        enter(InvocationStage::Preprocessed, &request.id);

        let raw = self
            .inner
            .engine
            .infer(&request.inputs)
            .await
            .map_err(InvocationError::Engine)?;
        let response = InferResponse::answering(&request).with_outputs(wrap_outputs(raw)?);
        enter(InvocationStage::Inferred, &response.id);

        let response = match self.hook::<InferResponse>(HookRole::Postprocessor)? {
            Some(hook) => self.run_blocking(HookRole::Postprocessor, hook, response).await?,
            None => response,
        };
        enter(InvocationStage::Postprocessed, &response.id);
        Ok(response)
    }

    fn hook<E>(&self, role: HookRole) -> Result<Option<Arc<dyn Hook<E>>>, InvocationError>
    where
        Self: Resolve<E>,
    {
        match self.resolve() {
            Ok(hook) => Ok(Some(hook)),
            Err(err) => match self.inner.config.missing_hook_policy {
                MissingHookPolicy::PassThrough => {
                    debug!(role = %role, "no hook bound, passing through");
                    Ok(None)
                }
                MissingHookPolicy::Reject => Err(err.into()),
            },
        }
    }

    /// Runs a user transform on the blocking pool.
    ///
    /// The transform holds a slot until it returns, even if the caller's
    /// future is dropped first, so timed-out transforms still count against
    /// `max_concurrent_requests`.
    async fn run_blocking<E>(
        &self,
        role: HookRole,
        hook: Arc<dyn Hook<E>>,
        envelope: E,
    ) -> Result<E, InvocationError>
    where
        E: Send + 'static,
    {
        let slot = Arc::clone(&self.inner.transform_slots)
            .acquire_owned()
            .await
            .map_err(|_| InvocationError::transform(role, TransformError::new("cancelled")))?;
        let outcome = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            hook.apply(envelope)
        })
        .await;
        match outcome {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(err)) => Err(InvocationError::transform(role, err)),
            Err(join) => Err(InvocationError::transform(role, join_failure(join))),
        }
    }
}

/// Role lookup keyed by envelope type.
trait Resolve<E> {
    fn resolve(&self) -> Result<Arc<dyn Hook<E>>, RegistryError>;
}

impl Resolve<InferRequest> for InferenceService {
    fn resolve(&self) -> Result<Arc<dyn Hook<InferRequest>>, RegistryError> {
        self.inner.registry.preprocessor().map(Arc::clone)
    }
}

impl Resolve<InferResponse> for InferenceService {
    fn resolve(&self) -> Result<Arc<dyn Hook<InferResponse>>, RegistryError> {
        self.inner.registry.postprocessor().map(Arc::clone)
    }
}

fn enter(stage: InvocationStage, id: &str) {
    tracing::Span::current().record("stage", stage.as_str());
    debug!(id = %id, stage = %stage, "invocation advanced");
}

fn wrap_outputs(raw: Vec<RawOutput>) -> Result<Vec<OutputDescriptor>, InvocationError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, output)| output.into_descriptor(index).map_err(InvocationError::from))
        .collect()
}

fn join_failure(err: JoinError) -> TransformError {
    if err.is_panic() {
        TransformError::new(format!("panicked: {}", panic_message(&*err.into_panic())))
    } else {
        TransformError::new("cancelled")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

// ---------------------------------------------------------------------------
// tower::Service
// ---------------------------------------------------------------------------

impl Service<InferRequest> for InferenceService {
    type Response = InferResponse;
    type Error = InvocationError;
    type Future = Pin<Box<dyn Future<Output = Result<InferResponse, InvocationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: InferRequest) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { service.invoke(request).await })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
