//! Process-wide model session holder
//!
//! The session is created exactly once, before the listener binds, and is
//! shared read-only by every request for the life of the process. Requests
//! only ever borrow the backend through an `Arc`; nothing mutates it after
//! initialization.

use crate::config::ServiceConfig;
use crate::error::{RemovalError, Result};
use crate::inference::SegmentationBackend;
use crate::models::ModelSource;
use std::sync::Arc;

/// Holder for the initialized segmentation backend
#[derive(Clone)]
pub struct SessionHolder {
    backend: Arc<dyn SegmentationBackend>,
    source_label: String,
}

impl SessionHolder {
    /// Initialize a session from the configured model source chain.
    ///
    /// Sources are attempted in the order `ServiceConfig::model_sources`
    /// yields them; every attempt is logged, and the first one that produces
    /// a working session wins. Exhausting the chain is fatal — the caller
    /// must not begin serving traffic.
    pub async fn initialize(config: &ServiceConfig) -> Result<Self> {
        let sources = config.model_sources();
        let mut failures: Vec<String> = Vec::new();

        for source in &sources {
            tracing::info!(source = %source.display_name(), "Attempting model source");
            match Self::load_source(source, config).await {
                Ok(backend) => {
                    tracing::info!(
                        source = %source.display_name(),
                        backend = %backend.describe(),
                        "Model session initialized"
                    );
                    return Ok(Self {
                        backend,
                        source_label: source.display_name(),
                    });
                },
                Err(e) => {
                    tracing::warn!(
                        source = %source.display_name(),
                        error = %e,
                        "Model source failed, trying next"
                    );
                    failures.push(format!("{}: {e}", source.display_name()));
                },
            }
        }

        Err(RemovalError::model(format!(
            "No usable model session; attempted sources: [{}]",
            failures.join("; ")
        )))
    }

    /// Wrap an already-constructed backend (tests, custom deployments)
    #[must_use]
    pub fn with_backend(backend: Arc<dyn SegmentationBackend>) -> Self {
        let source_label = backend.describe();
        Self {
            backend,
            source_label,
        }
    }

    /// Shared handle to the backend; no per-request work happens here
    #[must_use]
    pub fn backend(&self) -> Arc<dyn SegmentationBackend> {
        Arc::clone(&self.backend)
    }

    /// Label of the model source that won at initialization
    #[must_use]
    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    #[cfg(feature = "onnx")]
    async fn load_source(
        source: &ModelSource,
        config: &ServiceConfig,
    ) -> Result<Arc<dyn SegmentationBackend>> {
        use crate::backends::OnnxBackend;
        use crate::download::ModelDownloader;
        use crate::models::{find_named_model, PreprocessingConfig};

        let (model_data, preprocessing, label) = match source {
            ModelSource::File(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    RemovalError::model_source_error(
                        &path.display().to_string(),
                        &e.to_string(),
                        &["check the path", "verify read permissions"],
                    )
                })?;
                let preprocessing = match PreprocessingConfig::from_sidecar(path)? {
                    Some(config_from_sidecar) => config_from_sidecar,
                    // No sidecar: assume the file is a copy of the configured
                    // named model and use its registry metadata.
                    None => find_named_model(&config.model_name)?.preprocessing,
                };
                (data, preprocessing, source.display_name())
            },
            ModelSource::Named(name) => {
                let model = find_named_model(name)?;
                let downloader = ModelDownloader::new()?;
                let path = downloader.ensure_cached(&model).await?;
                let data = std::fs::read(&path).map_err(|e| {
                    RemovalError::model_source_error(
                        &path.display().to_string(),
                        &e.to_string(),
                        &["clear the model cache and retry"],
                    )
                })?;
                (data, model.preprocessing, source.display_name())
            },
        };

        let backend = OnnxBackend::from_model_bytes(&model_data, preprocessing, config, &label)?;
        Ok(Arc::new(backend))
    }

    #[cfg(not(feature = "onnx"))]
    async fn load_source(
        _source: &ModelSource,
        _config: &ServiceConfig,
    ) -> Result<Arc<dyn SegmentationBackend>> {
        Err(RemovalError::model(
            "Built without an inference backend; enable the `onnx` feature",
        ))
    }
}

impl std::fmt::Debug for SessionHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHolder")
            .field("source", &self.source_label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SegmentationMask;
    use image::RgbaImage;

    struct StubBackend;

    impl SegmentationBackend for StubBackend {
        fn segment(&self, image: &RgbaImage) -> Result<SegmentationMask> {
            let (w, h) = image.dimensions();
            Ok(SegmentationMask::new(vec![128; (w * h) as usize], (w, h)))
        }

        fn describe(&self) -> String {
            "stub".to_string()
        }
    }

    #[test]
    fn test_holder_hands_out_shared_backend() {
        let holder = SessionHolder::with_backend(Arc::new(StubBackend));
        assert_eq!(holder.source_label(), "stub");

        let a = holder.backend();
        let b = holder.backend();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_initialize_fails_on_unknown_model() {
        let config = ServiceConfig::builder()
            .model_name("no-such-model")
            .build()
            .unwrap();

        let err = SessionHolder::initialize(&config).await.unwrap_err();
        assert!(matches!(err, RemovalError::Model(_)));
        assert!(err.to_string().contains("no-such-model"));
    }
}
