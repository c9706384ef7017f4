//! Dimension bounding for decoded images
//!
//! Large uploads dominate peak memory and inference latency; bounding the
//! longer side before inference keeps both predictable on small hosts. The
//! resize is lossy and irreversible — responses are produced at the bounded
//! resolution.

use image::{imageops, RgbaImage};

/// Bound the longer image dimension to `max_dimension`.
///
/// Returns the image unchanged (no copy) when it is already within the
/// bound. Otherwise both dimensions are scaled by
/// `max_dimension / max(width, height)`, rounded to the nearest integer and
/// clamped to at least 1, preserving aspect ratio within rounding tolerance.
#[must_use]
pub fn bound_dimensions(image: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let longer = width.max(height);
    if longer <= max_dimension {
        return image;
    }

    let scale = f64::from(max_dimension) / f64::from(longer);
    let new_width = scaled_dimension(width, scale);
    let new_height = scaled_dimension(height, scale);

    tracing::debug!(
        from = %format!("{width}x{height}"),
        to = %format!("{new_width}x{new_height}"),
        "Downsampling oversized image"
    );

    imageops::resize(&image, new_width, new_height, imageops::FilterType::Lanczos3)
}

fn scaled_dimension(dimension: u32, scale: f64) -> u32 {
    ((f64::from(dimension) * scale).round() as u32).max(1)
}
