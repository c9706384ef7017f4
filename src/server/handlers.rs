//! Request handlers
//!
//! The handlers own all transport-level validation; the engine below them
//! never sees HTTP concepts. Validation short-circuits in a fixed order so
//! every failure mode maps to one deterministic status and code.

use crate::server::error::ApiError;
use crate::server::AppState;
use crate::types::RawUpload;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

/// Multipart field names accepted as the upload, checked in order
const UPLOAD_FIELD_NAMES: &[&str] = &["image", "file"];

/// `GET /health` — liveness only, no model-session dependency
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /` — minimal upload form for manual testing
pub async fn index() -> Html<&'static str> {
    Html(
        r#"<h1>Background Removal API</h1>
<p>POST an image to <code>/remove-bg</code> to receive a transparent PNG.</p>
<form action="/remove-bg" method="post" enctype="multipart/form-data">
    <input type="file" name="image" accept="image/*" required>
    <button type="submit">Remove Background</button>
</form>
"#,
    )
}

/// `POST /remove-bg` — multipart upload, PNG response
pub async fn remove_bg(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::missing_image())?;

    let upload = extract_upload(&mut multipart, &state).await?;
    validate_upload(&upload, &state)?;

    let output = state.engine.remove(upload).await.map_err(ApiError::from)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        output.png,
    )
        .into_response())
}

/// Request body for the base64 variant
#[derive(Debug, Deserialize)]
struct Base64Request {
    image: Option<String>,
}

/// `POST /remove-bg-base64` — JSON in, JSON out
pub async fn remove_bg_base64(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = axum::body::to_bytes(request.into_body(), state.config.max_body_bytes)
        .await
        .map_err(|_| ApiError::payload_too_large(state.config.max_body_bytes))?;

    let parsed: Base64Request =
        serde_json::from_slice(&body).map_err(|_| ApiError::missing_image())?;
    let encoded = parsed.image.ok_or_else(ApiError::missing_image)?;
    if encoded.is_empty() {
        return Err(ApiError::empty_image("Empty image data"));
    }

    let data = BASE64
        .decode(encoded.as_bytes())
        .map_err(|_| ApiError::invalid_image())?;
    if data.is_empty() {
        return Err(ApiError::empty_image("Empty image data"));
    }

    let upload = RawUpload::new(Bytes::from(data), String::new(), None);
    let output = state.engine.remove(upload).await.map_err(ApiError::from)?;

    Ok(Json(json!({
        "success": true,
        "image": BASE64.encode(&output.png),
        "format": "png",
    })))
}

/// Pull the upload out of the multipart stream.
///
/// Fields are drained in arrival order; the first one named `image` or
/// `file` wins. Remaining fields are not read — the request scope drops
/// them with the stream.
async fn extract_upload(multipart: &mut Multipart, state: &AppState) -> Result<RawUpload, ApiError> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(&e, state))?;

        let Some(field) = field else {
            return Err(ApiError::missing_image());
        };

        let name = field.name().unwrap_or_default();
        if !UPLOAD_FIELD_NAMES.contains(&name) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(&e, state))?;

        return Ok(RawUpload::new(data, filename, content_type));
    }
}

/// Post-extraction checks, first failure wins
fn validate_upload(upload: &RawUpload, state: &AppState) -> Result<(), ApiError> {
    if upload.filename.is_empty() {
        return Err(ApiError::empty_image("No file selected"));
    }
    if upload.is_empty() {
        return Err(ApiError::empty_image("Empty image data"));
    }
    if state.config.enforce_extension_check && !crate::codec::extension_supported(&upload.filename)
    {
        return Err(ApiError::unsupported_type(&upload.filename));
    }
    Ok(())
}

/// A multipart read failure is either the body limit firing or a malformed
/// stream; everything that is not the limit reads as a missing upload.
fn multipart_error(error: &MultipartError, state: &AppState) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(state.config.max_body_bytes)
    } else {
        ApiError::missing_image()
    }
}
