//! Error types for the background removal service

use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, RemovalError>;

/// Error taxonomy for the request pipeline and startup path
#[derive(Error, Debug)]
pub enum RemovalError {
    /// Input/output errors (model file not found, cache dir not writable, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or undecodable image bytes
    #[error("Image decode error: {0}")]
    Decode(String),

    /// Upload carries a file extension outside the allow-list
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Backend inference errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// Inference exceeded the configured deadline
    #[error("Inference timed out after {0}s")]
    Timeout(u64),

    /// Model loading or session initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RemovalError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a model error with the attempted source and troubleshooting context
    pub fn model_source_error(source: &str, error: &str, suggestions: &[&str]) -> Self {
        let suggestion_text = if suggestions.is_empty() {
            String::new()
        } else {
            format!(" Suggestions: {}", suggestions.join(", "))
        };

        Self::Model(format!(
            "Failed to load model from '{source}': {error}.{suggestion_text}"
        ))
    }

    /// Create a configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {parameter}: {value} (valid range: {valid_range})"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RemovalError::decode("truncated header");
        assert!(matches!(err, RemovalError::Decode(_)));

        let err = RemovalError::unsupported_format("svg");
        assert!(matches!(err, RemovalError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_error_display() {
        let err = RemovalError::invalid_config("max dimension must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: max dimension must be positive"
        );

        let err = RemovalError::Timeout(60);
        assert_eq!(err.to_string(), "Inference timed out after 60s");
    }

    #[test]
    fn test_model_source_error_context() {
        let err = RemovalError::model_source_error(
            "/models/missing.onnx",
            "file not found",
            &["check the path", "verify permissions"],
        );
        let rendered = err.to_string();
        assert!(rendered.contains("/models/missing.onnx"));
        assert!(rendered.contains("Suggestions"));
    }

    #[test]
    fn test_config_value_error() {
        let err = RemovalError::config_value_error("max_dimension", 0, ">= 1");
        let rendered = err.to_string();
        assert!(rendered.contains("max_dimension"));
        assert!(rendered.contains(">= 1"));
    }
}
