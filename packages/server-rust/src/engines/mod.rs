//! Built-in `InferenceEngine` implementations.

pub mod echo;

pub use echo::EchoEngine;
