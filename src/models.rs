//! Model sources, the pretrained-model registry, and preprocessing metadata

use crate::error::{RemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model source specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSource {
    /// External model from filesystem path
    File(PathBuf),
    /// Named pretrained model, downloaded to the cache on first use
    Named(String),
}

impl ModelSource {
    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::File(path) => format!("file:{}", path.display()),
            Self::Named(name) => format!("named:{name}"),
        }
    }
}

/// Preprocessing configuration a model expects for its input tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Square input size (width, height) of the model
    pub target_size: [u32; 2],
    /// Per-channel normalization mean (RGB, 0-1 range)
    pub normalization_mean: [f32; 3],
    /// Per-channel normalization std (RGB)
    pub normalization_std: [f32; 3],
}

impl PreprocessingConfig {
    /// Load preprocessing metadata from a sidecar JSON next to a local model
    /// file (`model.onnx` -> `model.json`). Returns `None` when no sidecar
    /// exists.
    pub fn from_sidecar(model_path: &Path) -> Result<Option<Self>> {
        let sidecar = model_path.with_extension("json");
        if !sidecar.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&sidecar)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            RemovalError::model(format!(
                "Invalid preprocessing sidecar '{}': {e}",
                sidecar.display()
            ))
        })?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Validate target size and normalization values
    pub fn validate(&self) -> Result<()> {
        if self.target_size[0] == 0 || self.target_size[1] == 0 {
            return Err(RemovalError::config_value_error(
                "target_size",
                format!("{}x{}", self.target_size[0], self.target_size[1]),
                ">= 1x1",
            ));
        }
        if self.normalization_std.iter().any(|&s| s == 0.0) {
            return Err(RemovalError::invalid_config(
                "normalization_std entries must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Registry entry for a named pretrained model
#[derive(Debug, Clone)]
pub struct NamedModel {
    /// Registry name, used in configuration
    pub name: &'static str,
    /// Download URL for the ONNX file
    pub url: &'static str,
    /// Preprocessing the model expects
    pub preprocessing: PreprocessingConfig,
}

/// Named models the service can download on demand.
///
/// Sizes and normalization constants match what each network was trained
/// with; `isnet-general-use` is the default for its balance of quality and
/// memory footprint.
#[must_use]
pub fn named_models() -> Vec<NamedModel> {
    vec![
        NamedModel {
            name: "isnet-general-use",
            url: "https://github.com/danielgatis/rembg/releases/download/v0.0.0/isnet-general-use.onnx",
            preprocessing: PreprocessingConfig {
                target_size: [1024, 1024],
                normalization_mean: [0.5, 0.5, 0.5],
                normalization_std: [1.0, 1.0, 1.0],
            },
        },
        NamedModel {
            name: "u2net",
            url: "https://github.com/danielgatis/rembg/releases/download/v0.0.0/u2net.onnx",
            preprocessing: PreprocessingConfig {
                target_size: [320, 320],
                normalization_mean: [0.485, 0.456, 0.406],
                normalization_std: [0.229, 0.224, 0.225],
            },
        },
        NamedModel {
            name: "u2netp",
            url: "https://github.com/danielgatis/rembg/releases/download/v0.0.0/u2netp.onnx",
            preprocessing: PreprocessingConfig {
                target_size: [320, 320],
                normalization_mean: [0.485, 0.456, 0.406],
                normalization_std: [0.229, 0.224, 0.225],
            },
        },
        NamedModel {
            name: "silueta",
            url: "https://github.com/danielgatis/rembg/releases/download/v0.0.0/silueta.onnx",
            preprocessing: PreprocessingConfig {
                target_size: [320, 320],
                normalization_mean: [0.485, 0.456, 0.406],
                normalization_std: [0.229, 0.224, 0.225],
            },
        },
    ]
}

/// Look up a named model in the registry
pub fn find_named_model(name: &str) -> Result<NamedModel> {
    named_models()
        .into_iter()
        .find(|m| m.name == name)
        .ok_or_else(|| {
            let known: Vec<&str> = named_models().iter().map(|m| m.name).collect();
            RemovalError::model(format!(
                "Unknown model '{name}'. Known models: {}",
                known.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_default_model() {
        let model = find_named_model("isnet-general-use").unwrap();
        assert_eq!(model.preprocessing.target_size, [1024, 1024]);
        assert!(model.url.ends_with(".onnx"));
    }

    #[test]
    fn test_unknown_model_lists_alternatives() {
        let err = find_named_model("not-a-model").unwrap_err();
        assert!(err.to_string().contains("isnet-general-use"));
    }

    #[test]
    fn test_source_display_names() {
        let file = ModelSource::File(PathBuf::from("/models/custom.onnx"));
        assert_eq!(file.display_name(), "file:/models/custom.onnx");

        let named = ModelSource::Named("u2net".to_string());
        assert_eq!(named.display_name(), "named:u2net");
    }

    #[test]
    fn test_preprocessing_validation() {
        let mut config = PreprocessingConfig {
            target_size: [0, 1024],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        };
        assert!(config.validate().is_err());

        config.target_size = [1024, 1024];
        config.normalization_std = [1.0, 0.0, 1.0];
        assert!(config.validate().is_err());

        config.normalization_std = [1.0, 1.0, 1.0];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sidecar_absent_is_none() {
        let config = PreprocessingConfig::from_sidecar(Path::new("/nonexistent/model.onnx"));
        assert!(matches!(config, Ok(None)));
    }

    #[test]
    fn test_sidecar_parse() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.onnx");
        std::fs::write(
            dir.path().join("model.json"),
            r#"{"target_size":[512,512],"normalization_mean":[0.5,0.5,0.5],"normalization_std":[1.0,1.0,1.0]}"#,
        )
        .unwrap();

        let config = PreprocessingConfig::from_sidecar(&model_path).unwrap().unwrap();
        assert_eq!(config.target_size, [512, 512]);
    }
}
