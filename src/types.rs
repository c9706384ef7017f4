//! Core types for the request-scoped removal pipeline

use crate::error::{RemovalError, Result};
use bytes::Bytes;
use image::{ImageBuffer, Rgba};

/// One uploaded file, captured once at the transport boundary.
///
/// Owned exclusively by the request that received it; every downstream stage
/// borrows it, and it drops with the request scope.
#[derive(Debug, Clone)]
pub struct RawUpload {
    /// Raw upload bytes as received
    pub data: Bytes,

    /// Filename declared by the client (may be empty)
    pub filename: String,

    /// Content type declared by the client, if any
    pub content_type: Option<String>,
}

impl RawUpload {
    /// Create a new upload value from transport-layer parts
    #[must_use]
    pub fn new(data: Bytes, filename: impl Into<String>, content_type: Option<String>) -> Self {
        Self {
            data,
            filename: filename.into(),
            content_type,
        }
    }

    /// Whether the upload carries no payload bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Single-channel segmentation mask
///
/// Values are alpha levels: 0 = background (fully transparent), 255 =
/// foreground (fully opaque). Dimensions always match the normalized image
/// the mask was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &ImageBuffer<image::Luma<u8>, Vec<u8>>) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.as_raw().clone(), (width, height))
    }

    /// Convert mask to a grayscale image
    pub fn to_image(&self) -> Result<ImageBuffer<image::Luma<u8>, Vec<u8>>> {
        let (width, height) = self.dimensions;
        ImageBuffer::from_raw(width, height, self.data.clone())
            .ok_or_else(|| RemovalError::internal("Mask data does not match its dimensions"))
    }

    /// Replace the alpha channel of an RGBA image with this mask.
    ///
    /// RGB values are left untouched; mask values map directly to output
    /// alpha with no blending math.
    pub fn apply_to_image(&self, image: &mut ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<()> {
        let (img_width, img_height) = image.dimensions();
        if (img_width, img_height) != self.dimensions {
            return Err(RemovalError::internal(format!(
                "Mask dimensions {}x{} do not match image {}x{}",
                self.dimensions.0, self.dimensions.1, img_width, img_height
            )));
        }

        for (i, pixel) in image.pixels_mut().enumerate() {
            if let Some(&alpha) = self.data.get(i) {
                pixel[3] = alpha;
            }
        }

        Ok(())
    }
}

/// Per-stage timing breakdown for one removal request
#[derive(Debug, Clone, Default)]
pub struct ProcessingTimings {
    /// Image decode from upload bytes
    pub decode_ms: u64,

    /// Dimension-bounding resize
    pub normalize_ms: u64,

    /// Backend inference (includes tensor conversion)
    pub inference_ms: u64,

    /// Mask application to the alpha channel
    pub composite_ms: u64,

    /// PNG encoding
    pub encode_ms: u64,

    /// Total end-to-end pipeline time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// One-line summary for request logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "total={}ms decode={}ms normalize={}ms inference={}ms composite={}ms encode={}ms",
            self.total_ms,
            self.decode_ms,
            self.normalize_ms,
            self.inference_ms,
            self.composite_ms,
            self.encode_ms
        )
    }
}

/// Final pipeline product: encoded PNG plus response metadata
#[derive(Debug, Clone)]
pub struct OutputImage {
    /// Encoded PNG bytes with the mask applied as alpha
    pub png: Vec<u8>,

    /// Output dimensions (width, height), post-normalization
    pub dimensions: (u32, u32),

    /// Per-stage timings for logging
    pub timings: ProcessingTimings,
}

impl OutputImage {
    /// Output width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    /// Output height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_mask_apply_replaces_alpha_only() {
        let mut image = ImageBuffer::from_pixel(2, 2, Rgba([10u8, 20, 30, 255]));
        let mask = SegmentationMask::new(vec![0, 64, 128, 255], (2, 2));

        mask.apply_to_image(&mut image).unwrap();

        assert_eq!(image.get_pixel(0, 0).0, [10, 20, 30, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [10, 20, 30, 64]);
        assert_eq!(image.get_pixel(0, 1).0, [10, 20, 30, 128]);
        assert_eq!(image.get_pixel(1, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_mask_apply_rejects_dimension_mismatch() {
        let mut image = ImageBuffer::from_pixel(3, 3, Rgba([0u8, 0, 0, 255]));
        let mask = SegmentationMask::new(vec![255; 4], (2, 2));

        assert!(mask.apply_to_image(&mut image).is_err());
    }

    #[test]
    fn test_mask_image_round_trip() {
        let mask = SegmentationMask::new(vec![0, 50, 100, 150, 200, 250], (3, 2));
        let image = mask.to_image().unwrap();
        let restored = SegmentationMask::from_image(&image);

        assert_eq!(mask, restored);
    }

    #[test]
    fn test_mask_with_bad_dimensions_fails_conversion() {
        let mask = SegmentationMask::new(vec![255; 3], (2, 2));
        assert!(mask.to_image().is_err());
    }

    #[test]
    fn test_raw_upload_emptiness() {
        let upload = RawUpload::new(Bytes::new(), "photo.png", None);
        assert!(upload.is_empty());

        let upload = RawUpload::new(Bytes::from_static(b"\x89PNG"), "photo.png", None);
        assert!(!upload.is_empty());
    }
}
