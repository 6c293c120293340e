use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::service::InvocationError;

/// HTTP status for a failed request.
#[must_use]
pub fn status_for(err: &InvocationError) -> StatusCode {
    match err {
        InvocationError::Decode(_) => StatusCode::BAD_REQUEST,
        InvocationError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
        InvocationError::Transform { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        InvocationError::Overloaded | InvocationError::NotReady { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        InvocationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        InvocationError::Registry(_)
        | InvocationError::Engine(_)
        | InvocationError::EngineOutput(_)
        | InvocationError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for InvocationError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = json!({ "error": self.to_string(), "kind": self.kind() });
        (status, Json(body)).into_response()
    }
}
