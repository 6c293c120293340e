//! Transport configuration for the HTTP server.

use std::path::PathBuf;
use std::time::Duration;

/// Listener, TLS and HTTP-layer settings.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    pub tls: Option<TlsConfig>,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Upper bound on one HTTP exchange, including body transfer.
    pub request_timeout: Duration,
    /// Largest accepted request body. Image-sized tensors are large in JSON.
    pub max_body_bytes: usize,
    /// How long shutdown waits for in-flight requests.
    pub drain_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tls: None,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(60),
            max_body_bytes: 64 * 1024 * 1024,
            drain_timeout: Duration::from_secs(30),
        }
    }
}

impl NetworkConfig {
    /// `host:port` as passed to the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// PEM certificate and key for HTTPS.
///
/// No `Default`: certificate paths have no sensible defaults.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}
