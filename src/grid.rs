// src/grid.rs
//
// Flat pixel grid shared by the cipher and the metrics.

use crate::error::{EndcryptError, Result};
use image::{DynamicImage, GrayImage, RgbImage};

/// Owned image buffer: interleaved, row-major byte samples.
///
/// Invariant: `samples.len() == width * height * channels`, with
/// `channels` either 1 (grayscale) or 3 (RGB).
#[derive(Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    channels: u8,
    samples: Vec<u8>,
}

impl PixelGrid {
    pub fn new(width: u32, height: u32, channels: u8, samples: Vec<u8>) -> Result<Self> {
        if channels != 1 && channels != 3 {
            return Err(EndcryptError::invalid_argument(
                "channels",
                channels.to_string(),
                "Only 1 (grayscale) or 3 (RGB) channels are supported",
            ));
        }
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(EndcryptError::dimension_mismatch(
                format!("{expected} samples for {width}x{height}x{channels}"),
                format!("{} samples", samples.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    pub fn from_fn(
        width: u32,
        height: u32,
        channels: u8,
        mut f: impl FnMut(u32, u32, u8) -> u8,
    ) -> Result<Self> {
        let mut samples = Vec::with_capacity(width as usize * height as usize * channels as usize);
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    samples.push(f(x, y, c));
                }
            }
        }
        Self::new(width, height, channels, samples)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    pub fn same_shape(&self, other: &PixelGrid) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }

    /// `WxHxC` label used in error messages.
    pub fn shape_label(&self) -> String {
        format!("{}x{}x{}", self.width, self.height, self.channels)
    }

    /// Grayscale sources stay single channel; everything else becomes RGB
    /// (alpha is dropped, 16-bit and float sources are quantized to 8 bit).
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        let (width, height) = (img.width(), img.height());
        match img {
            DynamicImage::ImageLuma8(gray) => Self::new(width, height, 1, gray.into_raw()),
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => {
                Self::new(width, height, 1, img.to_luma8().into_raw())
            }
            DynamicImage::ImageRgb8(rgb) => Self::new(width, height, 3, rgb.into_raw()),
            other => Self::new(width, height, 3, other.to_rgb8().into_raw()),
        }
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let buffer_error =
            || EndcryptError::internal_panic("pixel grid does not fit an image buffer");
        match self.channels {
            1 => GrayImage::from_raw(self.width, self.height, self.samples.clone())
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(buffer_error),
            _ => RgbImage::from_raw(self.width, self.height, self.samples.clone())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(buffer_error),
        }
    }
}

impl std::fmt::Debug for PixelGrid {
    // Samples are omitted: grids are large and may hold the plaintext image.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}
