//! Reference host: serves one model through the pass-through handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ferrix_server::engines::EchoEngine;
use ferrix_server::hooks::{HookRegistry, PassThroughHandler};
use ferrix_server::network::{NetworkConfig, NetworkModule, TlsConfig};
use ferrix_server::service::{InferenceService, MissingHookPolicy, ModelConfig, ServerConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ferrix-server", version, about = "Serve a model behind handler hooks")]
struct Cli {
    /// Address to bind
    #[arg(long, env = "FERRIX_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "FERRIX_PORT", default_value_t = 6565)]
    port: u16,

    /// Model config file (TOML: model_name, model_version, base_path, extended_config)
    #[arg(short, long, env = "FERRIX_MODEL_CONFIG", value_name = "FILE")]
    model_config: Option<PathBuf>,

    /// Model name to serve when no model config is given
    #[arg(long, env = "FERRIX_MODEL_NAME", default_value = "model")]
    model_name: String,

    /// What to do when the handler leaves a hook role unbound
    #[arg(long, env = "FERRIX_MISSING_HOOK_POLICY", value_enum, default_value_t = MissingHookPolicy::PassThrough)]
    missing_hook_policy: MissingHookPolicy,

    /// Per-request invocation timeout in milliseconds
    #[arg(long, env = "FERRIX_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    request_timeout_ms: u64,

    /// In-flight invocations before new requests are shed
    #[arg(long, env = "FERRIX_MAX_CONCURRENT", default_value_t = 1000)]
    max_concurrent: u32,

    /// PEM certificate; enables HTTPS together with --tls-key
    #[arg(long, env = "FERRIX_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    #[arg(long, env = "FERRIX_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "FERRIX_LOG_JSON")]
    log_json: bool,
}

impl Cli {
    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let config = ServerConfig {
            model_name: self.model_name.clone(),
            request_timeout_ms: self.request_timeout_ms,
            max_concurrent_requests: self.max_concurrent,
            missing_hook_policy: self.missing_hook_policy,
            ..ServerConfig::default()
        };
        let Some(path) = &self.model_config else {
            return Ok(config);
        };
        let model = ModelConfig::load(path)?;
        info!(
            model = %model.model_name,
            base_path = %model.base_path.display(),
            "model config loaded"
        );
        Ok(config.with_model(&model))
    }

    fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            request_timeout: Duration::from_millis(self.request_timeout_ms)
                + Duration::from_secs(5),
            ..NetworkConfig::default()
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let config = cli.server_config()?;
    let registry = HookRegistry::load(&PassThroughHandler)?;
    let service = InferenceService::new(Arc::new(registry), Arc::new(EchoEngine::new()), config);
    service.load_engine().await?;

    let mut network = NetworkModule::new(cli.network_config(), service).with_metrics(metrics);
    let port = network.start().await?;
    info!(port, "ferrix-server listening");

    network
        .serve(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "cannot listen for ctrl-c, serving until killed");
                std::future::pending::<()>().await;
            }
        })
        .await
}
