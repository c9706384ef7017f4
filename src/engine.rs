//! Background removal engine
//!
//! Orchestrates the request-scoped pipeline:
//! decode → normalize → segment → composite → encode. The engine is
//! stateless and side-effect free; every buffer it creates is owned by the
//! current request and dropped when the call returns, on success and on
//! every failure path alike.

use crate::codec;
use crate::config::ServiceConfig;
use crate::error::{RemovalError, Result};
use crate::inference::SegmentationBackend;
use crate::normalize;
use crate::session::SessionHolder;
use crate::types::{OutputImage, ProcessingTimings, RawUpload};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{instrument, span, Level};

/// Engine coordinating one removal pipeline per request
pub struct RemovalEngine {
    backend: Arc<dyn SegmentationBackend>,
    max_dimension: u32,
    inference_timeout: Duration,
}

impl RemovalEngine {
    /// Create an engine borrowing the process-wide session
    #[must_use]
    pub fn new(session: &SessionHolder, config: &ServiceConfig) -> Self {
        Self {
            backend: session.backend(),
            max_dimension: config.max_dimension,
            inference_timeout: Duration::from_secs(config.inference_timeout_secs),
        }
    }

    /// Run the full pipeline on a blocking thread under the configured
    /// deadline.
    ///
    /// The pipeline is CPU-bound, so it runs on the blocking pool to keep
    /// async workers responsive. A deadline expiry surfaces as
    /// `RemovalError::Timeout`; inference is the only stage that can
    /// realistically consume the budget.
    pub async fn remove(self: Arc<Self>, upload: RawUpload) -> Result<OutputImage> {
        let engine = self;
        let deadline = engine.inference_timeout;

        let work = tokio::task::spawn_blocking(move || engine.remove_sync(&upload));

        match tokio::time::timeout(deadline, work).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(RemovalError::internal(format!(
                "Pipeline task failed: {join_error}"
            ))),
            Err(_) => Err(RemovalError::Timeout(deadline.as_secs())),
        }
    }

    /// Run the full pipeline synchronously
    #[instrument(skip(self, upload), fields(filename = %upload.filename, bytes = upload.data.len()))]
    pub fn remove_sync(&self, upload: &RawUpload) -> Result<OutputImage> {
        let mut timings = ProcessingTimings::default();
        let total_start = Instant::now();

        let decoded = {
            let _span = span!(Level::DEBUG, "decode").entered();
            let decode_start = Instant::now();
            let decoded = codec::decode(&upload.data)?;
            timings.decode_ms = decode_start.elapsed().as_millis() as u64;
            decoded
        };

        let mut normalized = {
            let _span = span!(Level::DEBUG, "normalize").entered();
            let normalize_start = Instant::now();
            let normalized = normalize::bound_dimensions(decoded, self.max_dimension);
            timings.normalize_ms = normalize_start.elapsed().as_millis() as u64;
            normalized
        };
        let dimensions = normalized.dimensions();

        let mask = {
            let _span = span!(Level::INFO, "inference", backend = %self.backend.describe()).entered();
            let inference_start = Instant::now();
            let mask = self.backend.segment(&normalized)?;
            timings.inference_ms = inference_start.elapsed().as_millis() as u64;
            mask
        };

        if mask.dimensions != dimensions {
            return Err(RemovalError::inference(format!(
                "Backend returned a {}x{} mask for a {}x{} image",
                mask.dimensions.0, mask.dimensions.1, dimensions.0, dimensions.1
            )));
        }

        {
            let _span = span!(Level::DEBUG, "composite").entered();
            let composite_start = Instant::now();
            mask.apply_to_image(&mut normalized)?;
            timings.composite_ms = composite_start.elapsed().as_millis() as u64;
        }

        let png = {
            let _span = span!(Level::DEBUG, "encode").entered();
            let encode_start = Instant::now();
            let png = codec::encode_png(&normalized)?;
            timings.encode_ms = encode_start.elapsed().as_millis() as u64;
            png
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        tracing::info!(
            dimensions = %format!("{}x{}", dimensions.0, dimensions.1),
            timing = %timings.summary(),
            "Background removal completed"
        );

        Ok(OutputImage {
            png,
            dimensions,
            timings,
        })
    }

    /// Configured bound on the longer image dimension
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }
}

impl std::fmt::Debug for RemovalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemovalEngine")
            .field("backend", &self.backend.describe())
            .field("max_dimension", &self.max_dimension)
            .field("inference_timeout", &self.inference_timeout)
            .finish()
    }
}
