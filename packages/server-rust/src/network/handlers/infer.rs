//! `POST /v2/models/{model}/infer`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use ferrix_core::{Encoding, InferRequest};
use tower::ServiceExt;

use super::AppState;
use crate::service::InvocationError;

/// Decodes the body in the negotiated encoding, runs the invocation
/// pipeline, and answers in the same encoding.
///
/// The path names the model; an empty request id is replaced by a fresh
/// UUID so responses can always be correlated.
pub async fn infer_handler(
    State(state): State<AppState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.shutdown.health_state().accepts_requests() {
        return InvocationError::NotReady { name: model }.into_response();
    }
    let _in_flight = state.shutdown.in_flight_guard();

    let encoding = Encoding::from_content_type(
        headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
    );

    match infer(&state, model, encoding, &body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn infer(
    state: &AppState,
    model: String,
    encoding: Encoding,
    body: &[u8],
) -> Result<Response, InvocationError> {
    if !state.service.serves(&model) {
        return Err(InvocationError::ModelNotFound { name: model });
    }

    let mut request: InferRequest = encoding.decode(body)?;
    request.model_name = Some(model);
    if request.id.is_empty() {
        request.id = uuid::Uuid::new_v4().to_string();
    }

    let response = state.pipeline.clone().oneshot(request).await?;
    let bytes = encoding
        .encode(&response)
        .map_err(InvocationError::Encode)?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(encoding.content_type()))],
        bytes,
    )
        .into_response())
}
