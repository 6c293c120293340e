use std::path::{Path, PathBuf};

use serde::Deserialize;

/// What the host does when a handler left a role unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MissingHookPolicy {
    /// Treat the missing transform as identity.
    #[default]
    PassThrough,
    /// Fail the request with an unregistered-role error.
    Reject,
}

/// Service-level configuration for the invocation pipeline.
///
/// Controls the served model identity, request timeouts, concurrency limits,
/// and the behavior for unbound hook roles.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Name requests must address; the only model this host serves.
    pub model_name: String,
    /// Version reported in metadata and stamped on responses.
    pub model_version: Option<String>,
    /// Timeout for one full invocation in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum number of in-flight invocations before load shedding.
    pub max_concurrent_requests: u32,
    pub missing_hook_policy: MissingHookPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_name: "model".to_string(),
            model_version: None,
            request_timeout_ms: 30_000,
            max_concurrent_requests: 1000,
            missing_hook_policy: MissingHookPolicy::PassThrough,
        }
    }
}

impl ServerConfig {
    /// Takes the model identity from a loaded model config file.
    #[must_use]
    pub fn with_model(mut self, model: &ModelConfig) -> Self {
        self.model_name.clone_from(&model.model_name);
        self.model_version.clone_from(&model.model_version);
        self
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Errors from reading a model config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read model config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid model config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Model description loaded from a TOML file.
///
/// ```toml
/// model_name = "resnet50"
/// model_version = "1"
/// base_path = "/models/resnet50"
///
/// [extended_config]
/// device = "cuda:0"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    pub model_name: String,
    #[serde(default)]
    pub model_version: Option<String>,
    /// Directory holding the model artifacts, handed to the engine.
    pub base_path: PathBuf,
    /// Engine-specific settings, passed through uninterpreted.
    #[serde(default)]
    pub extended_config: Option<toml::Table>,
}

impl ModelConfig {
    /// Parses a model config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`toml::de::Error`] if the text is not a valid model config.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads and parses the model config at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if its contents are not a valid model config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
