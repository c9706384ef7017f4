#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Background Removal Server
//!
//! An HTTP service that removes image backgrounds using a segmentation
//! model loaded once at startup and shared across all requests.
//!
//! The core is a request-scoped pipeline — decode → normalize → segment →
//! composite → encode — built around explicit ownership: every buffer a
//! request creates drops with the request, and every failure mode maps to a
//! typed error with a stable HTTP status.
//!
//! ## Components
//!
//! - [`session::SessionHolder`] — one ONNX session per process, initialized
//!   from a configurable model-source chain, shared read-only afterwards
//! - [`codec`] — untrusted bytes → RGBA pixels, RGBA pixels → PNG
//! - [`normalize`] — bounds the longer image dimension before inference
//! - [`engine::RemovalEngine`] — orchestrates the pipeline and owns the
//!   failure taxonomy
//! - [`server`] — axum routes, validation order, and the error → status
//!   table
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bgremove_server::{ServiceConfig, SessionHolder};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::builder().port(8080).build()?;
//! let session = SessionHolder::initialize(&config).await?;
//! bgremove_server::server::serve(config, &session).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Requests run concurrently on the Tokio runtime; the CPU-bound pipeline
//! executes on the blocking pool. The ONNX session is the only shared
//! resource — read-only after startup, with inference calls serialized
//! behind the backend's internal mutex because `ort`'s `Session::run`
//! requires exclusive access.

pub mod backends;
pub mod codec;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod inference;
pub mod models;
pub mod normalize;
pub mod preprocess;
pub mod server;
pub mod session;
pub mod types;

// Public API exports
#[cfg(feature = "onnx")]
pub use backends::OnnxBackend;
pub use config::{ExecutionProvider, ServiceConfig, ServiceConfigBuilder};
pub use download::ModelDownloader;
pub use engine::RemovalEngine;
pub use error::{RemovalError, Result};
pub use inference::SegmentationBackend;
pub use models::{find_named_model, ModelSource, NamedModel, PreprocessingConfig};
pub use server::{build_router, ApiError};
pub use session::SessionHolder;
pub use types::{OutputImage, ProcessingTimings, RawUpload, SegmentationMask};
