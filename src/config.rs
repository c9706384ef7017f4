//! Service configuration

use crate::error::{RemovalError, Result};
use crate::models::ModelSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Default maximum request body size: 10 MiB, safe on small hosts
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Default bound on the longer image dimension before inference
pub const DEFAULT_MAX_DIMENSION: u32 = 1200;

/// Default named model when no local path is configured
pub const DEFAULT_MODEL: &str = "isnet-general-use";

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon GPU acceleration
    CoreMl,
}

impl Default for ExecutionProvider {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = RemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(RemovalError::config_value_error(
                "execution_provider",
                other,
                "auto, cpu, cuda, coreml",
            )),
        }
    }
}

/// Configuration for the background removal service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listen address (injected by the deployment, e.g. `0.0.0.0`)
    pub listen_addr: String,

    /// Listen port (deployment platforms inject this via `PORT`)
    pub port: u16,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    /// Bound on the longer image dimension before inference
    pub max_dimension: u32,

    /// Local model file, tried before the named model when set
    pub model_path: Option<PathBuf>,

    /// Named pretrained model, downloaded to the cache on first use
    pub model_name: String,

    /// Deadline for one inference pass, in seconds
    pub inference_timeout_secs: u64,

    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,

    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,

    /// Reject uploads whose filename extension is outside the allow-list
    pub enforce_extension_check: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 10000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            model_path: None,
            model_name: DEFAULT_MODEL.to_string(),
            inference_timeout_secs: 60,
            execution_provider: ExecutionProvider::default(),
            intra_threads: 0,
            inter_threads: 0,
            enforce_extension_check: true,
        }
    }
}

impl ServiceConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::new()
    }

    /// Socket address string for the listener
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }

    /// Model sources in fallback order.
    ///
    /// A configured local path is tried first; the named model is the
    /// downloadable fallback. The order is data, not control flow, so a
    /// deployment can log and audit exactly what will be attempted.
    #[must_use]
    pub fn model_sources(&self) -> Vec<ModelSource> {
        let mut sources = Vec::new();
        if let Some(ref path) = self.model_path {
            sources.push(ModelSource::File(path.clone()));
        }
        sources.push(ModelSource::Named(self.model_name.clone()));
        sources
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(RemovalError::config_value_error(
                "max_dimension",
                self.max_dimension,
                ">= 1",
            ));
        }
        if self.max_body_bytes < 1024 {
            return Err(RemovalError::config_value_error(
                "max_body_bytes",
                self.max_body_bytes,
                ">= 1024",
            ));
        }
        if self.inference_timeout_secs == 0 {
            return Err(RemovalError::config_value_error(
                "inference_timeout_secs",
                self.inference_timeout_secs,
                ">= 1",
            ));
        }
        if self.model_name.is_empty() && self.model_path.is_none() {
            return Err(RemovalError::invalid_config(
                "No model configured: set a model name or a model path",
            ));
        }
        Ok(())
    }
}

/// Builder for `ServiceConfig`
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
        }
    }

    #[must_use]
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.max_body_bytes = bytes;
        self
    }

    #[must_use]
    pub fn max_dimension(mut self, pixels: u32) -> Self {
        self.config.max_dimension = pixels;
        self
    }

    #[must_use]
    pub fn model_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.model_path = path;
        self
    }

    #[must_use]
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.config.model_name = name.into();
        self
    }

    #[must_use]
    pub fn inference_timeout_secs(mut self, secs: u64) -> Self {
        self.config.inference_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn inter_threads(mut self, threads: usize) -> Self {
        self.config.inter_threads = threads;
        self
    }

    #[must_use]
    pub fn enforce_extension_check(mut self, enforce: bool) -> Self {
        self.config.enforce_extension_check = enforce;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServiceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
