//! Ferrix Core: inference envelopes, tensor descriptors, and wire codecs.
//!
//! This crate is the vocabulary shared by the host and handlers: the request
//! and response envelopes that flow through the preprocess -> infer ->
//! postprocess pipeline, and the immutable tensor descriptors they carry.

pub mod codec;
pub mod datatype;
pub mod envelope;
pub mod error;
pub mod parameter;
pub mod tensor;

pub use codec::Encoding;
pub use datatype::Datatype;
pub use envelope::{InferRequest, InferResponse};
pub use error::{CodecError, EnvelopeError, SchemaError};
pub use parameter::{ParameterValue, Parameters};
pub use tensor::{InputDescriptor, OutputDescriptor, TensorDescriptor};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
