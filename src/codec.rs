//! Image decoding and PNG encoding for untrusted upload bytes

use crate::error::{RemovalError, Result};
use image::RgbaImage;
use std::io::Cursor;
use std::path::Path;

/// Filename extensions accepted by the upload allow-list
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff"];

/// Decode untrusted image bytes into an RGBA pixel buffer.
///
/// Accepts any format the `image` crate was built with (PNG, JPEG, WebP,
/// BMP, TIFF). The result is always four channels: sources without alpha get
/// an opaque alpha plane synthesized.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    if bytes.is_empty() {
        return Err(RemovalError::decode("Empty image data"));
    }

    let image = image::load_from_memory(bytes)
        .map_err(|e| RemovalError::decode(format!("Could not decode image: {e}")))?;

    let rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(RemovalError::decode("Image has zero dimensions"));
    }

    Ok(rgba)
}

/// Encode an RGBA buffer as PNG bytes. Lossless, preserves transparency.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| RemovalError::internal(format!("PNG encoding failed: {e}")))?;
    Ok(buffer)
}

/// Check a declared filename against the extension allow-list.
///
/// A filename without any extension passes; the decoder sniffs the actual
/// format from magic bytes either way. Only an explicit, unrecognized
/// extension is rejected.
#[must_use]
pub fn extension_supported(filename: &str) -> bool {
    match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some(ext) => SUPPORTED_EXTENSIONS
            .iter()
            .any(|supported| ext.eq_ignore_ascii_case(supported)),
        None => true,
    }
}
