// src/engine/decoder.rs
//
// Decoder operations: JPEG, PNG, WebP, BMP, GIF via the image crate.

use crate::engine::common::run_with_panic_policy;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::{EndcryptError, Result};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(EndcryptError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(EndcryptError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Dimensions from the container header, without decoding pixels.
/// `None` when the header cannot be read.
pub fn header_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Read the header only and reject oversized images before any pixel
/// buffer is allocated. Unreadable headers are left for the decoder to report.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> Result<()> {
    match header_dimensions(bytes) {
        Some((width, height)) => check_dimensions(width, height),
        None => Ok(()),
    }
}

/// Unified decode entrypoint: header check, then a full decode under the
/// panic policy. Returns the image and the detected container format.
pub fn decode_image(bytes: &[u8]) -> Result<(DynamicImage, Option<ImageFormat>)> {
    if bytes.is_empty() {
        return Err(EndcryptError::decode_failed("empty image payload"));
    }
    let detected = detect_format(bytes);
    if detected.is_none() {
        return Err(EndcryptError::decode_failed("unrecognized image format"));
    }
    ensure_dimensions_safe(bytes)?;

    let img = run_with_panic_policy("decode:image", || {
        image::load_from_memory(bytes)
            .map_err(|e| EndcryptError::decode_failed(format!("decode failed: {e}")))
    })?;
    // Formats without a readable header skip the pre-check.
    check_dimensions(img.width(), img.height())?;
    if img.width() == 0 || img.height() == 0 {
        return Err(EndcryptError::decode_failed("image has zero width or height"));
    }
    Ok((img, detected))
}
