//! Background removal server binary

use anyhow::Context;
use bgremove_server::{ServiceConfig, SessionHolder};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP background removal service
#[derive(Debug, Parser)]
#[command(name = "bgremove-server", version, about)]
struct Args {
    /// Listen address
    #[arg(long, env = "BGREMOVE_LISTEN", default_value = "0.0.0.0")]
    listen: String,

    /// Listen port (deployment platforms inject PORT)
    #[arg(long, env = "PORT", default_value_t = 10000)]
    port: u16,

    /// Maximum request body size in bytes
    #[arg(long, env = "BGREMOVE_MAX_BODY_BYTES", default_value_t = bgremove_server::config::DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Bound on the longer image dimension before inference
    #[arg(long, env = "BGREMOVE_MAX_DIMENSION", default_value_t = bgremove_server::config::DEFAULT_MAX_DIMENSION)]
    max_dimension: u32,

    /// Local ONNX model file, tried before the named model
    #[arg(long, env = "BGREMOVE_MODEL_PATH")]
    model_path: Option<PathBuf>,

    /// Named pretrained model, downloaded to the cache on first use
    #[arg(long, env = "BGREMOVE_MODEL", default_value = bgremove_server::config::DEFAULT_MODEL)]
    model: String,

    /// Deadline for one inference pass, in seconds
    #[arg(long, env = "BGREMOVE_INFERENCE_TIMEOUT", default_value_t = 60)]
    inference_timeout: u64,

    /// Execution provider: auto, cpu, cuda, coreml
    #[arg(long, env = "BGREMOVE_EXECUTION_PROVIDER", default_value = "auto")]
    execution_provider: String,

    /// Intra-op inference threads (0 = auto)
    #[arg(long, env = "BGREMOVE_INTRA_THREADS", default_value_t = 0)]
    intra_threads: usize,

    /// Inter-op inference threads (0 = auto)
    #[arg(long, env = "BGREMOVE_INTER_THREADS", default_value_t = 0)]
    inter_threads: usize,

    /// Disable the filename extension allow-list
    #[arg(long, env = "BGREMOVE_NO_EXTENSION_CHECK")]
    no_extension_check: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServiceConfig> {
        let provider = self
            .execution_provider
            .parse()
            .context("Invalid execution provider")?;

        ServiceConfig::builder()
            .listen_addr(self.listen)
            .port(self.port)
            .max_body_bytes(self.max_body_bytes)
            .max_dimension(self.max_dimension)
            .model_path(self.model_path)
            .model_name(self.model)
            .inference_timeout_secs(self.inference_timeout)
            .execution_provider(provider)
            .intra_threads(self.intra_threads)
            .inter_threads(self.inter_threads)
            .enforce_extension_check(!self.no_extension_check)
            .build()
            .context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bgremove_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config()?;
    tracing::info!(
        bind = %config.bind_address(),
        model = %config.model_name,
        model_path = ?config.model_path,
        max_dimension = config.max_dimension,
        "Starting bgremove-server"
    );

    // Session initialization is fatal on failure: a process without a
    // working model must never start accepting uploads.
    let session = SessionHolder::initialize(&config)
        .await
        .context("Model session initialization failed")?;

    bgremove_server::server::serve(config, &session)
        .await
        .context("Server terminated with an error")?;

    Ok(())
}
