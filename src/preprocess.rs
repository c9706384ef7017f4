//! Tensor preprocessing and mask extraction for segmentation models
//!
//! Models take a fixed square RGB input; images are resized preserving
//! aspect ratio and centered on a padded canvas. Mask extraction reproduces
//! the same transformation in reverse so the mask lines up with the source
//! image pixel-for-pixel.

use crate::error::{RemovalError, Result};
use crate::models::PreprocessingConfig;
use crate::types::SegmentationMask;
use image::{imageops, ImageBuffer, RgbImage, RgbaImage};
use ndarray::Array4;

/// Padding color for the model input canvas
const PADDING_COLOR: [u8; 3] = [255, 255, 255];

/// Coordinate transformation between image space and tensor space
#[derive(Debug, Clone)]
struct TensorLayout {
    /// Scale factor applied during preprocessing
    scale: f32,
    /// X offset for centering
    offset_x: u32,
    /// Y offset for centering
    offset_y: u32,
    /// Tensor width
    tensor_width: u32,
    /// Tensor height
    tensor_height: u32,
}

impl TensorLayout {
    fn for_dimensions(target_size: u32, (width, height): (u32, u32)) -> Self {
        let target = target_size as f32;
        let scale = (target / width as f32).min(target / height as f32);

        let scaled_width = (width as f32 * scale).round() as u32;
        let scaled_height = (height as f32 * scale).round() as u32;

        Self {
            scale,
            offset_x: (target_size - scaled_width.min(target_size)) / 2,
            offset_y: (target_size - scaled_height.min(target_size)) / 2,
            tensor_width: target_size,
            tensor_height: target_size,
        }
    }
}

/// Convert an RGBA image to a normalized NCHW input tensor.
///
/// The alpha plane is dropped; segmentation models consume RGB. The image is
/// scaled into the model's square input preserving aspect ratio and centered
/// on a white canvas.
pub fn image_to_tensor(image: &RgbaImage, config: &PreprocessingConfig) -> Result<Array4<f32>> {
    let target_size = config.target_size[0];
    let layout = TensorLayout::for_dimensions(target_size, image.dimensions());

    let rgb: RgbImage = ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        image::Rgb([p[0], p[1], p[2]])
    });

    let scaled_width = ((image.width() as f32 * layout.scale).round() as u32).max(1);
    let scaled_height = ((image.height() as f32 * layout.scale).round() as u32).max(1);
    let resized = imageops::resize(
        &rgb,
        scaled_width,
        scaled_height,
        imageops::FilterType::Triangle,
    );

    let mut canvas = ImageBuffer::from_pixel(target_size, target_size, image::Rgb(PADDING_COLOR));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let canvas_x = x + layout.offset_x;
        let canvas_y = y + layout.offset_y;
        if canvas_x < target_size && canvas_y < target_size {
            canvas.put_pixel(canvas_x, canvas_y, *pixel);
        }
    }

    let size = usize::try_from(target_size)
        .map_err(|_| RemovalError::internal("Model input size exceeds addressable memory"))?;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    #[allow(clippy::indexing_slicing)]
    // Safe: tensor dimensions pre-allocated to match canvas size
    for (y, row) in canvas.rows().enumerate() {
        for (x, pixel) in row.enumerate() {
            for channel in 0..3 {
                let value = (f32::from(pixel[channel]) / 255.0
                    - config.normalization_mean[channel])
                    / config.normalization_std[channel];
                tensor[[0, channel, y, x]] = value;
            }
        }
    }

    Ok(tensor)
}

/// Extract a segmentation mask from a model output tensor, mapped back to
/// the dimensions of the image the tensor was built from.
pub fn mask_from_tensor(
    tensor: &Array4<f32>,
    image_dimensions: (u32, u32),
) -> Result<SegmentationMask> {
    let shape = tensor.shape();
    if shape.first().copied().unwrap_or(0) != 1 || shape.get(1).copied().unwrap_or(0) != 1 {
        return Err(RemovalError::inference(format!(
            "Unexpected output tensor shape {shape:?}, expected [1, 1, h, w]"
        )));
    }

    let tensor_height = shape.get(2).copied().unwrap_or(0) as u32;
    let tensor_width = shape.get(3).copied().unwrap_or(0) as u32;
    if tensor_width == 0 || tensor_height == 0 {
        return Err(RemovalError::inference("Output tensor has zero dimensions"));
    }

    // Reproduce the forward transformation; models use square inputs, so the
    // tensor width doubles as the target size.
    let mut layout = TensorLayout::for_dimensions(tensor_width, image_dimensions);
    layout.tensor_height = tensor_height;

    let (width, height) = image_dimensions;
    let mut data = Vec::with_capacity((width as usize) * (height as usize));

    for y in 0..height {
        for x in 0..width {
            let value = sample_tensor(tensor, x, y, &layout);
            data.push((value.clamp(0.0, 1.0) * 255.0) as u8);
        }
    }

    Ok(SegmentationMask::new(data, image_dimensions))
}

fn sample_tensor(tensor: &Array4<f32>, x: u32, y: u32, layout: &TensorLayout) -> f32 {
    let tensor_x = (x as f32 * layout.scale).round() as u32 + layout.offset_x;
    let tensor_y = (y as f32 * layout.scale).round() as u32 + layout.offset_y;

    if tensor_x < layout.tensor_width && tensor_y < layout.tensor_height {
        tensor
            .get([0, 0, tensor_y as usize, tensor_x as usize])
            .copied()
            .unwrap_or(0.0)
    } else {
        // Outside the model's prediction area (padding region)
        0.0
    }
}
