//! Shared test utilities: deterministic mock backends and request builders

// Each integration test binary compiles its own copy; not every binary uses
// every helper.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use bgremove_server::{
    build_router, RemovalEngine, Result, SegmentationBackend, SegmentationMask, ServiceConfig,
    SessionHolder,
};
use http_body_util::BodyExt;
use image::{Rgba, RgbaImage};
use std::sync::Arc;

pub const TEST_BOUNDARY: &str = "----bgremove-test-boundary";

/// Mask derived from each pixel's red channel.
///
/// Deterministic per input, different across inputs — responses can be
/// traced back to the exact upload that produced them, which is what the
/// concurrency tests rely on to catch cross-request mixing.
pub struct RedChannelMask;

impl SegmentationBackend for RedChannelMask {
    fn segment(&self, image: &RgbaImage) -> Result<SegmentationMask> {
        let data = image.pixels().map(|p| p[0]).collect();
        Ok(SegmentationMask::new(data, image.dimensions()))
    }

    fn describe(&self) -> String {
        "red-channel-mask".to_string()
    }
}

/// Backend that always fails, for the 500-path tests
pub struct BrokenBackend;

impl SegmentationBackend for BrokenBackend {
    fn segment(&self, _image: &RgbaImage) -> Result<SegmentationMask> {
        Err(bgremove_server::RemovalError::inference(
            "mock backend failure",
        ))
    }

    fn describe(&self) -> String {
        "broken".to_string()
    }
}

/// Build an app router around a mock backend
pub fn test_router(backend: Arc<dyn SegmentationBackend>, config: ServiceConfig) -> Router {
    let session = SessionHolder::with_backend(backend);
    let config = Arc::new(config);
    let engine = Arc::new(RemovalEngine::new(&session, &config));
    build_router(engine, config)
}

/// Default test configuration
pub fn test_config() -> ServiceConfig {
    ServiceConfig::default()
}

/// Encode a solid-color PNG fixture
pub fn png_fixture(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    encode_png(&image)
}

pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut buffer),
            image::ImageFormat::Png,
        )
        .unwrap();
    buffer
}

/// Build a multipart request for `/remove-bg`
pub fn multipart_request(field_name: &str, filename: Option<&str>, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{TEST_BOUNDARY}\r\n").as_bytes());
    match filename {
        Some(filename) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field_name}\"\r\n").as_bytes(),
        ),
    }
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{TEST_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/remove-bg")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={TEST_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Build a JSON request for `/remove-bg-base64`
pub fn base64_request(json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/remove-bg-base64")
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

/// Collect a response body into bytes
pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
