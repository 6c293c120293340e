//! Server and model metadata endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::hooks::HookRole;
use crate::service::InvocationError;

pub const SERVER_NAME: &str = "ferrix";

#[derive(Debug, Serialize)]
pub struct ServerMetadata {
    pub name: &'static str,
    pub version: &'static str,
    pub extensions: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ModelMetadata {
    pub name: String,
    pub versions: Vec<String>,
    pub platform: String,
    /// Handler whose hooks wrap the model.
    pub handler: String,
    /// Bound hook roles, in pipeline order.
    pub hooks: Vec<&'static str>,
}

pub async fn server_metadata_handler() -> Json<ServerMetadata> {
    Json(ServerMetadata {
        name: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        extensions: Vec::new(),
    })
}

pub async fn model_metadata_handler(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Result<Json<ModelMetadata>, InvocationError> {
    let service = &state.service;
    if !service.serves(&model) {
        return Err(InvocationError::ModelNotFound { name: model });
    }
    Ok(Json(ModelMetadata {
        name: model,
        versions: service.config().model_version.iter().cloned().collect(),
        platform: service.engine().platform().to_string(),
        handler: service.registry().handler_name().to_string(),
        hooks: service
            .registry()
            .roles()
            .into_iter()
            .map(HookRole::as_str)
            .collect(),
    }))
}

/// 200 when the model is loaded, 503 while it is not, 404 for other names.
pub async fn model_ready_handler(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Response {
    if !state.service.serves(&model) {
        return InvocationError::ModelNotFound { name: model }.into_response();
    }
    if state.service.is_ready() {
        StatusCode::OK.into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::handlers::test_support::app_state;

    #[tokio::test]
    async fn server_metadata_names_the_server() {
        let Json(meta) = server_metadata_handler().await;
        assert_eq!(meta.name, "ferrix");
        assert_eq!(meta.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn model_metadata_lists_hooks() {
        let state = app_state().await;
        let Json(meta) = model_metadata_handler(State(state), Path("model".to_string()))
            .await
            .unwrap();
        assert_eq!(meta.platform, "echo");
        assert_eq!(meta.handler, "pass-through");
        assert_eq!(meta.hooks, vec!["preprocessor", "postprocessor"]);
        assert!(meta.versions.is_empty());
    }

    #[tokio::test]
    async fn unknown_model_metadata_is_not_found() {
        let state = app_state().await;
        let err = model_metadata_handler(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "model_not_found");
    }

    #[tokio::test]
    async fn model_ready_statuses() {
        let state = app_state().await;
        let ok = model_ready_handler(State(state.clone()), Path("model".to_string())).await;
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = model_ready_handler(State(state), Path("nope".to_string())).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
