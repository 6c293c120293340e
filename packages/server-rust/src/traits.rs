use async_trait::async_trait;
use ferrix_core::{Datatype, InputDescriptor, OutputDescriptor, SchemaError, TensorDescriptor};

/// Datatype given to raw outputs that do not declare one.
pub const DEFAULT_OUTPUT_DATATYPE: Datatype = Datatype::Fp32;

/// Pluggable model executor.
/// Implementations: ONNX, `PyTorch`, candle (external), echo (tests and smoke runs).
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Short platform tag reported in model metadata (e.g. `"onnxruntime"`).
    fn platform(&self) -> &str;

    /// Load model weights. Called once before the server reports ready.
    async fn load(&self) -> anyhow::Result<()>;

    /// Whether `load` has completed successfully.
    fn loaded(&self) -> bool;

    /// Execute the model on the preprocessed inputs.
    async fn infer(&self, inputs: &[InputDescriptor]) -> anyhow::Result<Vec<RawOutput>>;
}

/// One unwrapped engine result, before the host turns it into a descriptor.
///
/// Only `contents` is required; the host fills in a positional name, the
/// default datatype, and a one-dimensional shape for whatever is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutput {
    pub name: Option<String>,
    pub datatype: Option<Datatype>,
    pub shape: Option<Vec<u64>>,
    pub contents: Vec<f64>,
}

impl RawOutput {
    #[must_use]
    pub fn new(contents: Vec<f64>) -> Self {
        Self {
            contents,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = Some(datatype);
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: Vec<u64>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Default name of the output at `index` (`output0`, `output1`, ...).
    #[must_use]
    pub fn default_name(index: usize) -> String {
        format!("output{index}")
    }

    /// Wraps this output as the `index`-th descriptor of a response.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if a declared shape does not match the contents.
    pub fn into_descriptor(self, index: usize) -> Result<OutputDescriptor, SchemaError> {
        let name = self.name.unwrap_or_else(|| Self::default_name(index));
        let datatype = self.datatype.unwrap_or(DEFAULT_OUTPUT_DATATYPE);
        let shape = self
            .shape
            .unwrap_or_else(|| vec![self.contents.len() as u64]);
        TensorDescriptor::new(name, datatype, shape, None, self.contents)
    }
}

impl From<Vec<f64>> for RawOutput {
    fn from(contents: Vec<f64>) -> Self {
        Self::new(contents)
    }
}
