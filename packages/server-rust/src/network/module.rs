//! HTTP transport with deferred startup.
//!
//! `new()` wires state, `start()` binds the listener (so callers learn the
//! real port), and `serve()` accepts connections until the shutdown future
//! resolves, then drains in-flight inference requests.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    health_handler, infer_handler, liveness_handler, metrics_handler, model_metadata_handler,
    model_ready_handler, readiness_handler, server_metadata_handler, AppState,
};
use super::middleware::with_http_layers;
use super::shutdown::ShutdownController;
use crate::service::{build_invocation_pipeline, InferenceService};

pub struct NetworkModule {
    config: NetworkConfig,
    service: InferenceService,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    metrics: Option<PrometheusHandle>,
}

impl NetworkModule {
    #[must_use]
    pub fn new(config: NetworkConfig, service: InferenceService) -> Self {
        Self {
            config,
            service,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            metrics: None,
        }
    }

    /// Exposes a Prometheus recorder at `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Routes plus HTTP middleware, ready to serve.
    ///
    /// - `GET /health`, `/v2/health/live`, `/v2/health/ready`
    /// - `GET /v2`, `/v2/models/{model}`, `/v2/models/{model}/ready`
    /// - `POST /v2/models/{model}/infer`
    /// - `GET /metrics`
    #[must_use]
    pub fn build_router(&self) -> Router {
        let state = AppState {
            pipeline: build_invocation_pipeline(self.service.clone(), self.service.config()),
            service: self.service.clone(),
            shutdown: Arc::clone(&self.shutdown),
            start_time: Instant::now(),
            metrics: self.metrics.clone(),
        };

        let router = Router::new()
            .route("/health", get(health_handler))
            .route("/v2/health/live", get(liveness_handler))
            .route("/v2/health/ready", get(readiness_handler))
            .route("/v2", get(server_metadata_handler))
            .route("/v2/models/{model}", get(model_metadata_handler))
            .route("/v2/models/{model}/ready", get(model_ready_handler))
            .route("/v2/models/{model}/infer", post(infer_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state);

        with_http_layers(router, &self.config)
    }

    /// Binds the listener and returns the bound port (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;
        let port = listener.local_addr()?.port();
        info!(host = %self.config.host, port, "listener bound");
        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves or the controller's
    /// [`ShutdownController::trigger_shutdown`] fires, then drains in-flight
    /// requests.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, TLS material cannot be
    /// loaded, or the server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .context("start() must be called before serve()")?;
        let router = self.build_router();
        let ctl = Arc::clone(&self.shutdown);

        ctl.set_ready();

        let lifecycle = Arc::clone(&ctl);
        let mut stopping = ctl.shutdown_receiver();
        let triggered = async move {
            loop {
                let stop = *stopping.borrow_and_update();
                if stop || stopping.changed().await.is_err() {
                    break;
                }
            }
        };
        let shutdown = async move {
            tokio::select! {
                () = shutdown => {
                    lifecycle.trigger_shutdown();
                }
                () = triggered => {}
            }
            info!("shutdown requested, no longer accepting requests");
        };

        match &self.config.tls {
            Some(tls) => serve_tls(listener, router, tls, shutdown).await?,
            None => {
                info!("serving plain HTTP");
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown)
                    .await?;
            }
        }

        if ctl.drain(self.config.drain_timeout).await {
            info!("all requests drained");
        } else {
            warn!(
                in_flight = ctl.in_flight_count(),
                "drain timeout expired with requests in flight"
            );
        }
        Ok(())
    }
}

async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .context("failed to load TLS certificates")?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let on_shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown.await;
        on_shutdown.graceful_shutdown(None);
    });

    info!(%addr, "serving HTTPS");
    axum_server::from_tcp_rustls(std_listener, rustls)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engines::EchoEngine;
    use crate::hooks::{HookRegistry, PassThroughHandler};
    use crate::network::HealthState;
    use crate::service::ServerConfig;

    fn module(port: u16) -> NetworkModule {
        let service = InferenceService::new(
            Arc::new(HookRegistry::load(&PassThroughHandler).unwrap()),
            Arc::new(EchoEngine::new()),
            ServerConfig::default(),
        );
        NetworkModule::new(
            NetworkConfig {
                host: "127.0.0.1".to_string(),
                port,
                ..NetworkConfig::default()
            },
            service,
        )
    }

    #[tokio::test]
    async fn start_binds_an_os_assigned_port() {
        let mut m = module(0);
        let port = m.start().await.unwrap();
        assert!(port > 0);
        assert!(m.listener.is_some());
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let err = module(0).serve(std::future::pending::<()>()).await.unwrap_err();
        assert!(err.to_string().contains("start()"));
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown_signal() {
        let mut m = module(0);
        m.start().await.unwrap();
        let ctl = m.shutdown_controller();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(m.serve(async move {
            let _ = rx.await;
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ctl.health_state(), HealthState::Ready);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(ctl.health_state(), HealthState::Stopped);
    }

    #[tokio::test]
    async fn controller_trigger_stops_the_server() {
        let mut m = module(0);
        m.start().await.unwrap();
        let ctl = m.shutdown_controller();

        let server = tokio::spawn(m.serve(std::future::pending::<()>()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ctl.health_state(), HealthState::Ready);

        assert!(ctl.trigger_shutdown());
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should stop after trigger_shutdown")
            .unwrap()
            .unwrap();
        assert_eq!(ctl.health_state(), HealthState::Stopped);
    }
}
