//! Echo engine: returns every input unchanged as a raw output.
//!
//! Used by the reference binary for smoke runs and by tests that need a
//! predictable engine. It performs no numeric work.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ferrix_core::InputDescriptor;

use crate::traits::{InferenceEngine, RawOutput};

/// Engine whose outputs are copies of its inputs.
#[derive(Debug, Default)]
pub struct EchoEngine {
    loaded: AtomicBool,
}

impl EchoEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InferenceEngine for EchoEngine {
    fn platform(&self) -> &str {
        "echo"
    }

    async fn load(&self) -> anyhow::Result<()> {
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    fn loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    async fn infer(&self, inputs: &[InputDescriptor]) -> anyhow::Result<Vec<RawOutput>> {
        if !self.loaded() {
            anyhow::bail!("echo engine used before load");
        }
        Ok(inputs
            .iter()
            .map(|input| {
                RawOutput::new(input.contents().to_vec())
                    .with_name(input.name())
                    .with_datatype(input.datatype())
                    .with_shape(input.shape().to_vec())
            })
            .collect())
    }
}
