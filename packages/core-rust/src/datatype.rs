//! Tensor element types.
//!
//! Tags follow the KServe v2 tensor schema (`"FP32"`, `"INT64"`, ...). Only
//! numeric element kinds are supported; `BYTES` tensors have no flat numeric
//! representation and are rejected as unknown.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Element type of a tensor descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Datatype {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Fp16,
    Fp32,
    Fp64,
}

impl Datatype {
    /// All supported datatypes, in wire-tag order.
    pub const ALL: [Datatype; 12] = [
        Datatype::Bool,
        Datatype::Uint8,
        Datatype::Uint16,
        Datatype::Uint32,
        Datatype::Uint64,
        Datatype::Int8,
        Datatype::Int16,
        Datatype::Int32,
        Datatype::Int64,
        Datatype::Fp16,
        Datatype::Fp32,
        Datatype::Fp64,
    ];

    /// Returns the wire tag for this datatype.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Datatype::Bool => "BOOL",
            Datatype::Uint8 => "UINT8",
            Datatype::Uint16 => "UINT16",
            Datatype::Uint32 => "UINT32",
            Datatype::Uint64 => "UINT64",
            Datatype::Int8 => "INT8",
            Datatype::Int16 => "INT16",
            Datatype::Int32 => "INT32",
            Datatype::Int64 => "INT64",
            Datatype::Fp16 => "FP16",
            Datatype::Fp32 => "FP32",
            Datatype::Fp64 => "FP64",
        }
    }

    /// Whether elements of this type are whole numbers.
    #[must_use]
    pub fn is_integral(self) -> bool {
        !matches!(self, Datatype::Fp16 | Datatype::Fp32 | Datatype::Fp64)
    }

    /// Value range `[min, end)` for integral types, `None` for floating point.
    ///
    /// The upper bound is exclusive so the 64-bit limits stay exact: `2^63`
    /// and `2^64` are representable as `f64` while `i64::MAX` and `u64::MAX`
    /// are not.
    #[must_use]
    pub fn integral_range(self) -> Option<(f64, f64)> {
        const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
        const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
        let range = match self {
            Datatype::Bool => (0.0, 2.0),
            Datatype::Uint8 => (0.0, f64::from(u8::MAX) + 1.0),
            Datatype::Uint16 => (0.0, f64::from(u16::MAX) + 1.0),
            Datatype::Uint32 => (0.0, f64::from(u32::MAX) + 1.0),
            Datatype::Uint64 => (0.0, TWO_POW_64),
            Datatype::Int8 => (f64::from(i8::MIN), f64::from(i8::MAX) + 1.0),
            Datatype::Int16 => (f64::from(i16::MIN), f64::from(i16::MAX) + 1.0),
            Datatype::Int32 => (f64::from(i32::MIN), f64::from(i32::MAX) + 1.0),
            Datatype::Int64 => (-TWO_POW_63, TWO_POW_63),
            Datatype::Fp16 | Datatype::Fp32 | Datatype::Fp64 => return None,
        };
        Some(range)
    }

    /// Returns true if `value` is representable as an element of this type.
    /// NaN and infinities are rejected for every type.
    #[must_use]
    pub fn accepts(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.integral_range() {
            None => true,
            Some((min, end)) => value.fract() == 0.0 && value >= min && value < end,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Datatype::ALL
            .into_iter()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownDatatype(s.to_string()))
    }
}

impl TryFrom<String> for Datatype {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Datatype> for String {
    fn from(value: Datatype) -> Self {
        value.as_str().to_string()
    }
}
