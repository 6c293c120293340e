//! Wire encodings for envelopes.
//!
//! JSON is the default HTTP body format. `MsgPack` uses named maps
//! (`rmp_serde::to_vec_named`) so field names survive on the wire and both
//! encodings carry the same structure.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Content type of JSON-encoded envelopes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of `MsgPack`-encoded envelopes.
pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

/// Body encoding negotiated from a `content-type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    MsgPack,
}

impl Encoding {
    /// Picks the encoding for a `content-type` value. Anything that is not
    /// `MsgPack` is treated as JSON.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(value) = content_type else {
            return Encoding::Json;
        };
        let mime = value.split(';').next().unwrap_or_default().trim();
        if mime.eq_ignore_ascii_case(MSGPACK_CONTENT_TYPE)
            || mime.eq_ignore_ascii_case("application/x-msgpack")
        {
            Encoding::MsgPack
        } else {
            Encoding::Json
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Encoding::Json => JSON_CONTENT_TYPE,
            Encoding::MsgPack => MSGPACK_CONTENT_TYPE,
        }
    }

    /// Encodes `value` in this encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the value cannot be serialized.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Encoding::Json => to_json(value),
            Encoding::MsgPack => to_msgpack(value),
        }
    }

    /// Decodes a value in this encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the bytes are malformed or violate a
    /// descriptor invariant.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Encoding::Json => from_json(bytes),
            Encoding::MsgPack => from_msgpack(bytes),
        }
    }
}

/// # Errors
///
/// Returns [`CodecError::Json`] on serialization failure.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(value)?)
}

/// # Errors
///
/// Returns [`CodecError::Json`] on malformed input or invariant violations.
pub fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// # Errors
///
/// Returns [`CodecError::MsgPackEncode`] on serialization failure.
pub fn to_msgpack<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// # Errors
///
/// Returns [`CodecError::MsgPackDecode`] on malformed input or invariant violations.
pub fn from_msgpack<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
