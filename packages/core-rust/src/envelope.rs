//! Request and response envelopes exchanged between the host and a handler.

use serde::{Deserialize, Serialize};

use crate::error::EnvelopeError;
use crate::parameter::{ParameterValue, Parameters};
use crate::tensor::{InputDescriptor, OutputDescriptor};

/// One inference call on its way into the model.
///
/// The host builds it from inbound wire data. A preprocessor receives it,
/// replaces `inputs` wholesale, and hands it back; from then on only `inputs`
/// is consumed. `parameters` is caller context (locators, options).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferRequest {
    /// Caller-visible request identifier, echoed on the response.
    #[serde(default)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub inputs: Vec<InputDescriptor>,
}

impl InferRequest {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Adds a parameter, builder style.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Replaces the input sequence, builder style.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<InputDescriptor>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Replaces the input sequence in place.
    pub fn set_inputs(&mut self, inputs: Vec<InputDescriptor>) {
        self.inputs = inputs;
    }

    /// Looks up a parameter by key.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingParameter`] if `key` is absent.
    pub fn parameter(&self, key: &str) -> Result<&ParameterValue, EnvelopeError> {
        self.parameters
            .get(key)
            .ok_or_else(|| EnvelopeError::MissingParameter {
                key: key.to_string(),
            })
    }

    /// Looks up a string parameter by key.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingParameter`] if `key` is absent and
    /// [`EnvelopeError::ParameterType`] if it holds a non-string value.
    pub fn str_parameter(&self, key: &str) -> Result<&str, EnvelopeError> {
        let value = self.parameter(key)?;
        value.as_str().ok_or_else(|| EnvelopeError::ParameterType {
            key: key.to_string(),
            expected: "string",
            actual: value.kind(),
        })
    }
}

/// The result of one inference call on its way back to the caller.
///
/// The host builds it from the engine's raw outputs; a postprocessor replaces
/// `outputs` wholesale. `parameters` is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferResponse {
    #[serde(default)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub outputs: Vec<OutputDescriptor>,
}

impl InferResponse {
    /// Starts a response that answers `request`, carrying over its identity.
    #[must_use]
    pub fn answering(request: &InferRequest) -> Self {
        Self {
            id: request.id.clone(),
            model_name: request.model_name.clone(),
            model_version: request.model_version.clone(),
            parameters: Parameters::new(),
            outputs: Vec::new(),
        }
    }

    /// Replaces the output sequence, builder style.
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<OutputDescriptor>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Replaces the output sequence in place.
    pub fn set_outputs(&mut self, outputs: Vec<OutputDescriptor>) {
        self.outputs = outputs;
    }

    /// Finds an output by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputDescriptor> {
        self.outputs.iter().find(|o| o.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::datatype::Datatype;
    use crate::tensor::TensorDescriptor;

    #[test]
    fn request_from_wire_defaults_to_no_inputs() {
        let request: InferRequest =
            serde_json::from_value(json!({ "parameters": { "image": "cat.jpg" } })).unwrap();

        assert!(request.id.is_empty());
        assert!(request.inputs.is_empty());
        assert_eq!(request.str_parameter("image").unwrap(), "cat.jpg");
    }

    #[test]
    fn missing_parameter_is_reported_by_key() {
        let request = InferRequest::new("1");
        assert_eq!(
            request.str_parameter("image").unwrap_err(),
            EnvelopeError::MissingParameter {
                key: "image".to_string()
            }
        );
    }

    #[test]
    fn mistyped_parameter_is_reported() {
        let request = InferRequest::new("1").with_parameter("image", 7_i64);
        assert_eq!(
            request.str_parameter("image").unwrap_err(),
            EnvelopeError::ParameterType {
                key: "image".to_string(),
                expected: "string",
                actual: "int",
            }
        );
    }

    #[test]
    fn set_inputs_replaces_the_whole_sequence() {
        let a = TensorDescriptor::vector("a", Datatype::Fp32, vec![1.0]).unwrap();
        let b = TensorDescriptor::vector("b", Datatype::Fp32, vec![2.0]).unwrap();
        let mut request = InferRequest::new("1").with_inputs(vec![a.clone(), a]);

        request.set_inputs(vec![b.clone()]);
        assert_eq!(request.inputs, vec![b]);
    }

    #[test]
    fn answering_copies_identity_but_not_payload() {
        let mut request = InferRequest::new("req-9").with_parameter("image", "cat.jpg");
        request.model_name = Some("resnet".to_string());

        let response = InferResponse::answering(&request);
        assert_eq!(response.id, "req-9");
        assert_eq!(response.model_name.as_deref(), Some("resnet"));
        assert!(response.parameters.is_empty());
        assert!(response.outputs.is_empty());
    }

    #[test]
    fn output_lookup_by_name() {
        let out = TensorDescriptor::vector("scores", Datatype::Fp32, vec![0.1, 0.9]).unwrap();
        let response = InferResponse::default().with_outputs(vec![out]);
        assert!(response.output("scores").is_some());
        assert!(response.output("missing").is_none());
    }

    #[test]
    fn optional_identity_fields_are_omitted_on_the_wire() {
        let value = serde_json::to_value(InferRequest::new("1")).unwrap();
        assert_eq!(value, json!({ "id": "1", "parameters": {}, "inputs": [] }));
    }
}
