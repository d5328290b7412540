// src/engine/resize.rs
//
// Normalization of decoded images to the fixed cipher grid.
// Resampling runs on fast_image_resize with an image crate fallback.

use crate::error::{EndcryptError, Result};
use crate::grid::PixelGrid;
use crate::params::ResizeStrategy;
use fast_image_resize::{self as fir, PixelType, ResizeOptions};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};

/// Bilinear convolution, the usual "linear" default of image toolkits.
fn resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear))
}

fn pixel_type(channels: u8) -> Result<PixelType> {
    match channels {
        1 => Ok(PixelType::U8),
        3 => Ok(PixelType::U8x3),
        other => Err(EndcryptError::invalid_argument(
            "channels",
            other.to_string(),
            "Only 1 or 3 channels can be resized",
        )),
    }
}

/// Fit `orig` inside `target`, keeping aspect ratio. Never returns a zero side.
pub fn calc_resize_dimensions(
    orig_w: u32,
    orig_h: u32,
    target_w: u32,
    target_h: u32,
) -> (u32, u32) {
    if orig_w == 0 || orig_h == 0 {
        return (target_w, target_h);
    }
    let orig_ratio = orig_w as f64 / orig_h as f64;
    let target_ratio = target_w as f64 / target_h as f64;
    let (w, h) = if orig_ratio > target_ratio {
        let ratio = target_w as f64 / orig_w as f64;
        (target_w, (orig_h as f64 * ratio).round() as u32)
    } else {
        let ratio = target_h as f64 / orig_h as f64;
        ((orig_w as f64 * ratio).round() as u32, target_h)
    };
    (w.clamp(1, target_w), h.clamp(1, target_h))
}

/// Resample a grid to exactly `dst_width` x `dst_height`.
pub fn resize_grid(grid: PixelGrid, dst_width: u32, dst_height: u32) -> Result<PixelGrid> {
    let (src_width, src_height, channels) = (grid.width(), grid.height(), grid.channels());
    let fail = |reason: String| {
        EndcryptError::resize_failed((src_width, src_height), (dst_width, dst_height), reason)
    };

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(fail("invalid dimensions for resize".to_string()));
    }
    if (src_width, src_height) == (dst_width, dst_height) {
        return Ok(grid);
    }

    let pixel_type = pixel_type(channels)?;
    let samples = grid.into_samples();
    let resized = match resize_with_fir(
        &samples,
        src_width,
        src_height,
        pixel_type,
        dst_width,
        dst_height,
    ) {
        Ok(pixels) => pixels,
        Err(err) => {
            tracing::warn!(error = %err, "fast resize failed, falling back to image crate");
            resize_with_image_crate_fallback(
                samples,
                src_width,
                src_height,
                channels,
                dst_width,
                dst_height,
            )
            .map_err(|fallback| fail(format!("{err}; image crate fallback failed: {fallback}")))?
        }
    };
    PixelGrid::new(dst_width, dst_height, channels, resized)
}

fn resize_with_fir(
    src_pixels: &[u8],
    src_width: u32,
    src_height: u32,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<Vec<u8>, String> {
    let src_image =
        fir::images::Image::from_vec_u8(src_width, src_height, src_pixels.to_vec(), pixel_type)
            .map_err(|e| format!("fir source image error: {e:?}"))?;
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &resize_options())
        .map_err(|e| format!("fir resize error: {e:?}"))?;
    Ok(dst_image.into_vec())
}

fn resize_with_image_crate_fallback(
    src_pixels: Vec<u8>,
    src_width: u32,
    src_height: u32,
    channels: u8,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<Vec<u8>, String> {
    let filter = FilterType::Triangle;
    match channels {
        1 => {
            let gray = GrayImage::from_raw(src_width, src_height, src_pixels)
                .ok_or_else(|| "failed to build gray image for fallback resize".to_string())?;
            Ok(image::imageops::resize(&gray, dst_width, dst_height, filter).into_raw())
        }
        3 => {
            let rgb = RgbImage::from_raw(src_width, src_height, src_pixels)
                .ok_or_else(|| "failed to build rgb image for fallback resize".to_string())?;
            Ok(image::imageops::resize(&rgb, dst_width, dst_height, filter).into_raw())
        }
        _ => Err("fallback resize supports only 1 or 3 channels".to_string()),
    }
}

/// Copy `inner` into the center of a black `width` x `height` canvas.
fn letterbox(inner: PixelGrid, width: u32, height: u32) -> Result<PixelGrid> {
    let channels = inner.channels() as usize;
    let off_x = ((width - inner.width()) / 2) as usize;
    let off_y = ((height - inner.height()) / 2) as usize;
    let row_len = inner.width() as usize * channels;
    let stride = width as usize * channels;

    let mut canvas = vec![0u8; stride * height as usize];
    for (y, row) in inner.samples().chunks_exact(row_len).enumerate() {
        let start = (off_y + y) * stride + off_x * channels;
        canvas[start..start + row_len].copy_from_slice(row);
    }
    PixelGrid::new(width, height, inner.channels(), canvas)
}

/// Convert a decoded image to a `size` x `size` grid.
///
/// Grayscale stays single channel; everything else becomes RGB with alpha
/// dropped. `Stretch` ignores aspect ratio, `Letterbox` keeps it and pads
/// with black.
pub fn normalize(img: DynamicImage, size: u32, strategy: ResizeStrategy) -> Result<PixelGrid> {
    let grid = PixelGrid::from_dynamic(img)?;
    match strategy {
        ResizeStrategy::Stretch => resize_grid(grid, size, size),
        ResizeStrategy::Letterbox => {
            let (w, h) = calc_resize_dimensions(grid.width(), grid.height(), size, size);
            let inner = resize_grid(grid, w, h)?;
            letterbox(inner, size, size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, LumaA, Rgb, Rgba, RgbaImage};

    fn near(a: u8, b: u8) -> bool {
        a.abs_diff(b) <= 1
    }

    #[test]
    fn calc_dimensions_fit_inside() {
        assert_eq!(calc_resize_dimensions(512, 256, 256, 256), (256, 128));
        assert_eq!(calc_resize_dimensions(100, 400, 256, 256), (64, 256));
        assert_eq!(calc_resize_dimensions(300, 300, 256, 256), (256, 256));
        // extreme ratios never collapse to zero
        assert_eq!(calc_resize_dimensions(10_000, 1, 256, 256), (256, 1));
    }

    #[test]
    fn stretch_produces_target_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 100, Rgb([10, 20, 30])));
        let grid = normalize(img, 256, ResizeStrategy::Stretch).unwrap();
        assert_eq!(grid.shape_label(), "256x256x3");
        assert!(grid
            .samples()
            .chunks(3)
            .all(|p| near(p[0], 10) && near(p[1], 20) && near(p[2], 30)));
    }

    #[test]
    fn one_pixel_is_upscaled() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([200, 100, 50])));
        let grid = normalize(img, 256, ResizeStrategy::Stretch).unwrap();
        assert_eq!(grid.pixel_count(), 256 * 256);
        assert!(grid
            .samples()
            .chunks(3)
            .all(|p| near(p[0], 200) && near(p[1], 100) && near(p[2], 50)));
    }

    #[test]
    fn grayscale_stays_single_channel() {
        let img = DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(30, 40, LumaA([77, 10])));
        let grid = normalize(img, 256, ResizeStrategy::Stretch).unwrap();
        assert_eq!(grid.channels(), 1);
        assert!(grid.samples().iter().all(|&v| near(v, 77)));
    }

    #[test]
    fn alpha_is_dropped() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 0])));
        let grid = normalize(img, 256, ResizeStrategy::Stretch).unwrap();
        assert_eq!(grid.channels(), 3);
        assert!(near(grid.samples()[0], 1) && near(grid.samples()[2], 3));
    }

    #[test]
    fn letterbox_pads_with_black() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(512, 256, Rgb([255, 255, 255])));
        let grid = normalize(img, 256, ResizeStrategy::Letterbox).unwrap();
        assert_eq!(grid.shape_label(), "256x256x3");
        let at = |x: usize, y: usize| grid.samples()[(y * 256 + x) * 3];
        assert_eq!(at(128, 0), 0);
        assert_eq!(at(128, 255), 0);
        assert!(at(128, 128) >= 254);
        assert!(at(0, 64) >= 254);
    }

    #[test]
    fn same_size_is_passthrough() {
        let grid = PixelGrid::from_fn(256, 256, 3, |x, y, c| (x ^ y) as u8 ^ c).unwrap();
        assert_eq!(resize_grid(grid.clone(), 256, 256).unwrap(), grid);
    }

    #[test]
    fn zero_target_is_a_resize_error() {
        let grid = PixelGrid::from_fn(4, 4, 1, |_, _, _| 0).unwrap();
        assert!(matches!(
            resize_grid(grid, 0, 4).unwrap_err(),
            EndcryptError::ResizeFailed { .. }
        ));
    }

    #[test]
    fn fallback_matches_target_shape() {
        let pixels = vec![9u8; 5 * 3 * 3];
        let out = resize_with_image_crate_fallback(pixels, 5, 3, 3, 10, 6).unwrap();
        assert_eq!(out.len(), 10 * 6 * 3);
        assert!(out.iter().all(|&v| near(v, 9)));
    }
}
