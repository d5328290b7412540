// src/engine/encoder.rs
//
// Encoder operations: lossless PNG (image + oxipng) and data URLs.

use crate::engine::common::run_with_panic_policy;
use crate::error::{EndcryptError, Result};
use crate::grid::PixelGrid;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;
use std::io::Cursor;

/// oxipng effort level. Outputs are 256x256 so higher presets buy little.
const OXIPNG_PRESET: u8 = 2;

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a grid to PNG. Lossless either way; `optimize` only shrinks bytes.
pub fn encode_png(grid: &PixelGrid, optimize: bool) -> Result<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let img = grid.to_dynamic()?;
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| EndcryptError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        if !optimize {
            return Ok(buf);
        }

        let mut options = oxipng::Options::from_preset(OXIPNG_PRESET);
        options.strip = oxipng::StripChunks::Safe;
        // The decoded color type must stay the grid's channel layout.
        options.bit_depth_reduction = false;
        options.color_type_reduction = false;
        options.palette_reduction = false;
        options.grayscale_reduction = false;
        oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            EndcryptError::encode_failed("png", format!("oxipng optimization failed: {e}"))
        })
    })
}

/// `data:image/png;base64,...`
pub fn to_data_url(png: &[u8]) -> String {
    let mut url = String::with_capacity(PNG_DATA_URL_PREFIX.len() + png.len().div_ceil(3) * 4);
    url.push_str(PNG_DATA_URL_PREFIX);
    STANDARD.encode_string(png, &mut url);
    url
}

/// Inverse of [`to_data_url`]. Accepts a bare base64 payload too.
pub fn from_data_url(url: &str) -> Result<Vec<u8>> {
    let payload = url.strip_prefix(PNG_DATA_URL_PREFIX).unwrap_or(url);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| EndcryptError::decode_failed(format!("invalid base64 payload: {e}")))
}

/// Encode a grid straight to a PNG data URL.
pub fn png_data_url(grid: &PixelGrid, optimize: bool) -> Result<String> {
    encode_png(grid, optimize).map(|png| to_data_url(&png))
}
