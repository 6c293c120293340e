//! Error types for envelope construction, parameter access, and wire codecs.

use crate::datatype::Datatype;

/// A tensor descriptor violated one of its construction invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("tensor name must not be empty")]
    EmptyName,
    #[error("tensor `{name}`: shape {shape:?} holds more elements than fit in memory")]
    ShapeOverflow { name: String, shape: Vec<u64> },
    #[error("tensor `{name}`: shape requires {expected} elements but contents has {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("tensor `{name}`: value {value} at index {index} is not a valid {datatype}")]
    ValueOutOfRange {
        name: String,
        datatype: Datatype,
        index: usize,
        value: f64,
    },
    #[error("tensor `{name}`: value {value} at index {index} is not finite")]
    NonFinite {
        name: String,
        index: usize,
        value: f64,
    },
    #[error("unknown tensor datatype `{0}`")]
    UnknownDatatype(String),
}

/// A request parameter lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("missing request parameter `{key}`")]
    MissingParameter { key: String },
    #[error("request parameter `{key}` is a {actual}, expected {expected}")]
    ParameterType {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Encoding or decoding an envelope failed.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid JSON envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid MessagePack envelope: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
    #[error("failed to encode MessagePack envelope: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),
}
