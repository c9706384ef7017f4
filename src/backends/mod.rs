//! Inference backend implementations
//!
//! One backend ships today: ONNX Runtime (feature `onnx`, enabled by
//! default). The `SegmentationBackend` trait keeps the door open for others
//! and lets tests inject deterministic fakes.

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;
