//! Segmentation backend abstraction
//!
//! The single point where ML inference enters the pipeline. Everything above
//! this trait treats segmentation as an opaque capability: pixels in, alpha
//! mask out.

use crate::error::Result;
use crate::types::SegmentationMask;
use image::RgbaImage;

/// Trait for segmentation backends
///
/// Implementations must be safe to call from any number of concurrent
/// requests; a backend wrapping a capability that is not itself thread-safe
/// is responsible for serializing access internally.
pub trait SegmentationBackend: Send + Sync {
    /// Segment an image into foreground and background.
    ///
    /// The returned mask has exactly the dimensions of `image`; values are
    /// alpha levels (0 = background, 255 = foreground).
    ///
    /// # Errors
    /// - Model inference failures
    /// - Tensor conversion or shape errors
    fn segment(&self, image: &RgbaImage) -> Result<SegmentationMask>;

    /// Human-readable description for startup and request logs
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemovalError;

    struct FullForeground;

    impl SegmentationBackend for FullForeground {
        fn segment(&self, image: &RgbaImage) -> Result<SegmentationMask> {
            let (w, h) = image.dimensions();
            Ok(SegmentationMask::new(
                vec![255; (w * h) as usize],
                (w, h),
            ))
        }

        fn describe(&self) -> String {
            "full-foreground".to_string()
        }
    }

    struct AlwaysFails;

    impl SegmentationBackend for AlwaysFails {
        fn segment(&self, _image: &RgbaImage) -> Result<SegmentationMask> {
            Err(RemovalError::inference("backend offline"))
        }

        fn describe(&self) -> String {
            "always-fails".to_string()
        }
    }

    #[test]
    fn test_backend_object_safety() {
        // The trait must stay object-safe; the session holder stores it as
        // Arc<dyn SegmentationBackend>.
        let backends: Vec<Box<dyn SegmentationBackend>> =
            vec![Box::new(FullForeground), Box::new(AlwaysFails)];

        let image = RgbaImage::new(3, 2);
        let mask = backends[0].segment(&image).unwrap();
        assert_eq!(mask.dimensions, (3, 2));
        assert!(backends[1].segment(&image).is_err());
    }
}
