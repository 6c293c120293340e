//! HTTP surface exercised through the assembled router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use async_trait::async_trait;
use axum::Router;
use ferrix_core::{
    codec, Datatype, InferRequest, InferResponse, InputDescriptor, ParameterValue,
    TensorDescriptor,
};
use ferrix_server::engines::EchoEngine;
use ferrix_server::hooks::{HookRegistry, PassThroughHandler, TransformError};
use ferrix_server::network::{NetworkConfig, NetworkModule, ShutdownController};
use ferrix_server::service::{InferenceService, ServerConfig};
use ferrix_server::traits::{InferenceEngine, RawOutput};
use tower::ServiceExt;

struct Harness {
    router: Router,
    shutdown: Arc<ShutdownController>,
}

async fn harness(registry: HookRegistry, load: bool) -> Harness {
    harness_with(registry, Arc::new(EchoEngine::new()), load).await
}

async fn harness_with(
    registry: HookRegistry,
    engine: Arc<dyn InferenceEngine>,
    load: bool,
) -> Harness {
    let config = ServerConfig {
        model_name: "resnet".to_string(),
        model_version: Some("1".to_string()),
        ..ServerConfig::default()
    };
    let service = InferenceService::new(Arc::new(registry), engine, config);
    if load {
        service.load_engine().await.unwrap();
    }
    let module = NetworkModule::new(NetworkConfig::default(), service);
    Harness {
        router: module.build_router(),
        shutdown: module.shutdown_controller(),
    }
}

async fn ready_harness() -> Harness {
    let h = harness(HookRegistry::load(&PassThroughHandler).unwrap(), true).await;
    h.shutdown.set_ready();
    h
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, content_type: &str, body: Vec<u8>) -> Request<Body> {
    Request::post(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap()
}

fn sample_request() -> InferRequest {
    InferRequest::new("http-1").with_inputs(vec![TensorDescriptor::new(
        "pixels",
        Datatype::Uint8,
        vec![2, 2],
        None,
        vec![0.0, 64.0, 128.0, 255.0],
    )
    .unwrap()])
}

#[tokio::test]
async fn infer_over_json() {
    let h = ready_harness().await;
    let body = codec::to_json(&sample_request()).unwrap();

    let (status, bytes) = send(
        &h.router,
        post("/v2/models/resnet/infer", "application/json", body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response: InferResponse = codec::from_json(&bytes).unwrap();
    assert_eq!(response.id, "http-1");
    assert_eq!(response.model_name.as_deref(), Some("resnet"));
    assert_eq!(response.model_version.as_deref(), Some("1"));
    let out = response.output("pixels").unwrap();
    assert_eq!(out.datatype(), Datatype::Uint8);
    assert_eq!(out.shape(), &[2, 2]);
    assert_eq!(out.contents(), &[0.0, 64.0, 128.0, 255.0]);
}

#[tokio::test]
async fn infer_over_msgpack() {
    let h = ready_harness().await;
    let body = codec::to_msgpack(&sample_request()).unwrap();

    let (status, bytes) = send(
        &h.router,
        post("/v2/models/resnet/infer", "application/msgpack", body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response: InferResponse = codec::from_msgpack(&bytes).unwrap();
    assert_eq!(response.id, "http-1");
    assert_eq!(response.outputs.len(), 1);
}

#[tokio::test]
async fn unknown_model_is_404() {
    let h = ready_harness().await;
    let body = codec::to_json(&sample_request()).unwrap();

    let (status, bytes) = send(
        &h.router,
        post("/v2/models/bert/infer", "application/json", body),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["kind"], "model_not_found");

    let (status, _) = send(&h.router, get("/v2/models/bert")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_400() {
    let h = ready_harness().await;
    let (status, bytes) = send(
        &h.router,
        post(
            "/v2/models/resnet/infer",
            "application/json",
            br#"{"inputs":[{"name":"x","datatype":"INT8","shape":[1],"contents":[0.5]}]}"#.to_vec(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["kind"], "decode_error");
}

#[tokio::test]
async fn transform_failure_is_422() {
    let mut builder = HookRegistry::builder("strict");
    builder
        .preprocessor(|request: InferRequest| -> Result<InferRequest, TransformError> {
            request.str_parameter("image")?;
            Ok(request)
        })
        .unwrap();
    let h = harness(builder.build(), true).await;
    h.shutdown.set_ready();

    let (status, bytes) = send(
        &h.router,
        post(
            "/v2/models/resnet/infer",
            "application/json",
            codec::to_json(&sample_request()).unwrap(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["kind"], "transform_error");
    assert_eq!(
        error["error"],
        "preprocessor failed: missing request parameter `image`"
    );
}

#[tokio::test]
async fn readiness_transitions() {
    let h = harness(HookRegistry::load(&PassThroughHandler).unwrap(), true).await;

    let (status, _) = send(&h.router, get("/v2/health/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    h.shutdown.set_ready();
    let (status, _) = send(&h.router, get("/v2/health/ready")).await;
    assert_eq!(status, StatusCode::OK);

    h.shutdown.trigger_shutdown();
    let (status, _) = send(&h.router, get("/v2/health/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&h.router, get("/v2/health/live")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unloaded_model_is_not_ready() {
    let h = harness(HookRegistry::load(&PassThroughHandler).unwrap(), false).await;
    h.shutdown.set_ready();

    let (status, _) = send(&h.router, get("/v2/health/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = send(&h.router, get("/v2/models/resnet/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, bytes) = send(
        &h.router,
        post(
            "/v2/models/resnet/infer",
            "application/json",
            codec::to_json(&sample_request()).unwrap(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["kind"], "not_ready");
}

#[tokio::test]
async fn metadata_endpoints() {
    let h = ready_harness().await;

    let (status, bytes) = send(&h.router, get("/v2")).await;
    assert_eq!(status, StatusCode::OK);
    let server: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(server["name"], "ferrix");

    let (status, bytes) = send(&h.router, get("/v2/models/resnet")).await;
    assert_eq!(status, StatusCode::OK);
    let model: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(model["name"], "resnet");
    assert_eq!(model["versions"], serde_json::json!(["1"]));
    assert_eq!(model["platform"], "echo");
    assert_eq!(model["hooks"], serde_json::json!(["preprocessor", "postprocessor"]));

    let (status, bytes) = send(&h.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health["state"], "ready");
    assert_eq!(health["model"], "resnet");

    let (status, _) = send(&h.router, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Declares three elements but only returns two.
struct MisshapenEngine;

#[async_trait]
impl InferenceEngine for MisshapenEngine {
    fn platform(&self) -> &str {
        "misshapen"
    }

    async fn load(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn loaded(&self) -> bool {
        true
    }

    async fn infer(&self, _inputs: &[InputDescriptor]) -> anyhow::Result<Vec<RawOutput>> {
        Ok(vec![RawOutput::new(vec![1.0, 2.0]).with_shape(vec![3])])
    }
}

#[tokio::test]
async fn invalid_engine_output_is_a_server_error() {
    let h = harness_with(
        HookRegistry::load(&PassThroughHandler).unwrap(),
        Arc::new(MisshapenEngine),
        true,
    )
    .await;
    h.shutdown.set_ready();

    let (status, bytes) = send(
        &h.router,
        post(
            "/v2/models/resnet/infer",
            "application/json",
            codec::to_json(&sample_request()).unwrap(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["kind"], "engine_output_error");
}

#[tokio::test]
async fn unencodable_response_is_a_server_error() {
    let mut builder = HookRegistry::builder("nan-score");
    builder
        .postprocessor(|mut response: InferResponse| -> Result<InferResponse, TransformError> {
            response
                .parameters
                .insert("score".to_string(), ParameterValue::Float(f64::NAN));
            Ok(response)
        })
        .unwrap();
    let h = harness(builder.build(), true).await;
    h.shutdown.set_ready();

    for content_type in ["application/json", "application/msgpack"] {
        let body = if content_type == "application/json" {
            codec::to_json(&sample_request()).unwrap()
        } else {
            codec::to_msgpack(&sample_request()).unwrap()
        };
        let (status, bytes) =
            send(&h.router, post("/v2/models/resnet/infer", content_type, body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{content_type}");
        let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["kind"], "encode_error");
    }
}
