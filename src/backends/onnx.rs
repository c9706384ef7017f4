//! ONNX Runtime segmentation backend
//!
//! Wraps one `ort` session created at startup. `Session::run` takes
//! `&mut self`, so the session is guarded by a mutex and `segment` calls are
//! serialized; all other pipeline stages run concurrently across requests.

use crate::config::{ExecutionProvider, ServiceConfig};
use crate::error::{RemovalError, Result};
use crate::inference::SegmentationBackend;
use crate::models::PreprocessingConfig;
use crate::preprocess;
use crate::types::SegmentationMask;
use image::RgbaImage;
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::sync::Mutex;

/// ONNX Runtime backend holding the process-wide inference session
pub struct OnnxBackend {
    // Session::run needs &mut; one mutex serializes inference only.
    session: Mutex<Session>,
    preprocessing: PreprocessingConfig,
    description: String,
}

impl OnnxBackend {
    /// Build a session from raw ONNX model bytes.
    ///
    /// # Errors
    /// - Session builder or execution provider configuration failures
    /// - Malformed model data
    pub fn from_model_bytes(
        model_data: &[u8],
        preprocessing: PreprocessingConfig,
        config: &ServiceConfig,
        source_label: &str,
    ) -> Result<Self> {
        preprocessing.validate()?;

        let session_builder = Session::builder()
            .map_err(|e| RemovalError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RemovalError::model(format!("Failed to set optimization level: {e}")))?
            .with_execution_providers(Self::select_providers(config.execution_provider))
            .map_err(|e| {
                RemovalError::model(format!("Failed to configure execution providers: {e}"))
            })?;

        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(8)
        };
        let inter_threads = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (intra_threads / 4).max(1)
        };

        let session = session_builder
            .with_parallel_execution(true)
            .map_err(|e| RemovalError::model(format!("Failed to enable parallel execution: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| RemovalError::model(format!("Failed to set intra threads: {e}")))?
            .with_inter_threads(inter_threads)
            .map_err(|e| RemovalError::model(format!("Failed to set inter threads: {e}")))?
            .commit_from_memory(model_data)
            .map_err(|e| {
                RemovalError::model(format!("Failed to create session from model data: {e}"))
            })?;

        tracing::info!(
            source = source_label,
            provider = %config.execution_provider,
            intra_threads,
            inter_threads,
            input_size = preprocessing.target_size[0],
            "ONNX Runtime session created"
        );

        let description = format!(
            "onnx:{source_label} ({}x{} input)",
            preprocessing.target_size[0], preprocessing.target_size[1]
        );

        Ok(Self {
            session: Mutex::new(session),
            preprocessing,
            description,
        })
    }

    /// Pick execution providers for the requested mode.
    ///
    /// Auto tries CUDA, then `CoreML`; ONNX Runtime falls back to CPU when
    /// the list is empty or none of the providers initialize.
    fn select_providers(
        provider: ExecutionProvider,
    ) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
        let mut providers = Vec::new();

        match provider {
            ExecutionProvider::Auto => {
                if OrtExecutionProvider::is_available(&CUDAExecutionProvider::default())
                    .unwrap_or(false)
                {
                    tracing::info!("CUDA execution provider available, using GPU acceleration");
                    providers.push(CUDAExecutionProvider::default().build());
                }
                if OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                    .unwrap_or(false)
                {
                    tracing::info!("CoreML execution provider available");
                    providers.push(CoreMLExecutionProvider::default().with_subgraphs(true).build());
                }
                if providers.is_empty() {
                    tracing::info!("No hardware acceleration available, using CPU");
                }
            },
            ExecutionProvider::Cuda => {
                if !OrtExecutionProvider::is_available(&CUDAExecutionProvider::default())
                    .unwrap_or(false)
                {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                }
                providers.push(CUDAExecutionProvider::default().build());
            },
            ExecutionProvider::CoreMl => {
                if !OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                    .unwrap_or(false)
                {
                    tracing::warn!("CoreML requested but not available, falling back to CPU");
                }
                providers.push(CoreMLExecutionProvider::default().build());
            },
            ExecutionProvider::Cpu => {},
        }

        providers
    }

    /// Run the session on one input tensor
    fn run_inference(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let input_value = Value::from_array(input.clone())
            .map_err(|e| RemovalError::inference(format!("Failed to convert input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| RemovalError::internal("Inference session mutex poisoned"))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| RemovalError::inference(format!("ONNX inference failed: {e}")))?;

        // Positional output access: take the first output tensor regardless
        // of its name, matching how these models are exported.
        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| RemovalError::inference("Model produced no output tensors"))?;
        let output_tensor = outputs
            .get(first_key)
            .ok_or_else(|| RemovalError::inference("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| RemovalError::inference(format!("Failed to extract output tensor: {e}")))?;

        let shape = output_tensor.shape();
        if shape.len() != 4 {
            return Err(RemovalError::inference(format!(
                "Expected 4D output tensor, got {}D",
                shape.len()
            )));
        }

        let dims = (
            shape.first().copied().unwrap_or(1),
            shape.get(1).copied().unwrap_or(1),
            shape.get(2).copied().unwrap_or(1),
            shape.get(3).copied().unwrap_or(1),
        );
        let data = output_tensor.view().to_owned();
        Array4::from_shape_vec(dims, data.into_raw_vec_and_offset().0)
            .map_err(|e| RemovalError::inference(format!("Failed to reshape output tensor: {e}")))
    }
}

impl SegmentationBackend for OnnxBackend {
    fn segment(&self, image: &RgbaImage) -> Result<SegmentationMask> {
        let input = preprocess::image_to_tensor(image, &self.preprocessing)?;

        tracing::debug!(shape = ?input.dim(), "Running segmentation inference");
        let output = self.run_inference(&input)?;

        preprocess::mask_from_tensor(&output, image.dimensions())
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

impl std::fmt::Debug for OnnxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxBackend")
            .field("description", &self.description)
            .field("preprocessing", &self.preprocessing)
            .finish_non_exhaustive()
    }
}
