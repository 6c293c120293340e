//! Named, typed, shaped tensor descriptors.
//!
//! A descriptor carries one tensor-like payload as flat row-major contents
//! plus the shape needed to reconstruct it. Descriptors are immutable once
//! built: every constructor, including deserialization, checks that
//! `contents.len()` equals the product of `shape`, so a descriptor that
//! violates the invariant cannot exist.

use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;
use crate::error::SchemaError;
use crate::parameter::Parameters;

/// One named tensor payload flowing through an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor")]
pub struct TensorDescriptor {
    name: String,
    datatype: Datatype,
    shape: Vec<u64>,
    parameters: Option<Parameters>,
    contents: Vec<f64>,
}

/// Descriptor of a tensor fed to the execution engine.
pub type InputDescriptor = TensorDescriptor;

/// Descriptor of a tensor returned to the caller.
pub type OutputDescriptor = TensorDescriptor;

impl TensorDescriptor {
    /// Builds a descriptor, validating the name, shape, and contents.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the name is empty, the shape's element count
    /// overflows, `contents.len()` differs from the shape's element count, a
    /// value is NaN or infinite, or a value cannot be represented by an
    /// integral `datatype`.
    pub fn new(
        name: impl Into<String>,
        datatype: Datatype,
        shape: Vec<u64>,
        parameters: Option<Parameters>,
        contents: Vec<f64>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }

        let expected = element_count(&shape).ok_or_else(|| SchemaError::ShapeOverflow {
            name: name.clone(),
            shape: shape.clone(),
        })?;
        if contents.len() != expected {
            return Err(SchemaError::LengthMismatch {
                name,
                expected,
                actual: contents.len(),
            });
        }

        if let Some((index, &value)) = contents
            .iter()
            .enumerate()
            .find(|(_, v)| !datatype.accepts(**v))
        {
            if !value.is_finite() {
                return Err(SchemaError::NonFinite { name, index, value });
            }
            return Err(SchemaError::ValueOutOfRange {
                name,
                datatype,
                index,
                value,
            });
        }

        Ok(Self {
            name,
            datatype,
            shape,
            parameters,
            contents,
        })
    }

    /// Builds a one-dimensional descriptor whose shape is `[contents.len()]`.
    ///
    /// # Errors
    ///
    /// Same as [`TensorDescriptor::new`], minus the length check which holds
    /// by construction.
    pub fn vector(
        name: impl Into<String>,
        datatype: Datatype,
        contents: Vec<f64>,
    ) -> Result<Self, SchemaError> {
        let shape = vec![contents.len() as u64];
        Self::new(name, datatype, shape, None, contents)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    #[must_use]
    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    /// Flat contents in row-major order.
    #[must_use]
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    /// Number of elements, equal to the product of the shape.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Returns a copy of this descriptor under a different name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyName`] if `name` is empty.
    pub fn with_name(&self, name: impl Into<String>) -> Result<Self, SchemaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        Ok(Self {
            name,
            ..self.clone()
        })
    }

    /// Returns a copy of this descriptor with a new shape over the same contents.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the new shape does not cover exactly
    /// `self.len()` elements.
    pub fn reshape(&self, shape: Vec<u64>) -> Result<Self, SchemaError> {
        Self::new(
            self.name.clone(),
            self.datatype,
            shape,
            self.parameters.clone(),
            self.contents.clone(),
        )
    }
}

/// Product of the dimensions, or `None` on overflow. The empty shape is a scalar.
fn element_count(shape: &[u64]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| {
        usize::try_from(dim).ok().and_then(|d| acc.checked_mul(d))
    })
}

/// Unvalidated wire form, converted through [`TensorDescriptor::new`].
#[derive(Deserialize)]
struct RawTensor {
    name: String,
    datatype: Datatype,
    shape: Vec<u64>,
    #[serde(default)]
    parameters: Option<Parameters>,
    contents: Vec<f64>,
}

impl TryFrom<RawTensor> for TensorDescriptor {
    type Error = SchemaError;

    fn try_from(raw: RawTensor) -> Result<Self, Self::Error> {
        TensorDescriptor::new(
            raw.name,
            raw.datatype,
            raw.shape,
            raw.parameters,
            raw.contents,
        )
    }
}
