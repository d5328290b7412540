// lib.rs
//
// endcrypt: chaotic image encryption with security metrics
//
// Design goals:
// - Bit-exact round trip on every platform (fixed-point chaos, no floats)
// - Permutation + chained diffusion rounds, strength chosen per request
// - Entropy / PSNR / distribution report for every run
// - Stateless engine, safe to share across threads

pub mod cipher;
pub mod engine;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod params;

use image::ImageReader;
use std::io::Cursor;

pub use cipher::{CancelFlag, ChaoticState, KeyScheduler, RoundTable};
pub use engine::{CipherEngine, EngineConfig, ProcessOutput, ProcessRequest, ProcessResponse};
pub use error::{EndcryptError, ErrorCategory, Result};
pub use grid::PixelGrid;
pub use metrics::{Distribution, ImageMetrics, MetricsCalculator};
pub use params::{EncryptionLevel, ResizeStrategy};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header-only view of an encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
}

/// Read format and dimensions without decoding pixel data.
pub fn inspect_header(data: &[u8]) -> Result<InspectMetadata> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| EndcryptError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{f:?}").to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| EndcryptError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(InspectMetadata {
        width,
        height,
        format,
    })
}
