// src/engine.rs
//
// The request-level side of endcrypt:
// 1. Decodes uploads and normalizes them onto the fixed cipher grid
// 2. Runs the cipher forward and back, then measures the result
// 3. Encodes the three images and shapes the endpoint response
//
// This file is a facade over the modules in engine/.

// =============================================================================
// LIMITS
// =============================================================================

/// Side length of the cipher grid every upload is normalized to.
pub const GRID_SIZE: u32 = 256;

/// Maximum allowed image dimension (width or height).
/// Larger images are rejected before decoding to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height) at decode time.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod common;
mod config;
mod decoder;
mod encoder;
mod pattern;
mod pipeline;
mod pool;
mod resize;
mod response;

pub use api::{read_source, CipherEngine, ProcessOutput, ProcessRequest};
pub use common::{retry_transient_io, run_with_panic_policy};
pub use config::{
    EngineConfig, ENV_MAX_INPUT_BYTES, ENV_MIN_KEY_CHARS, ENV_PNG_OPTIMIZE, ENV_RESIZE, ENV_ROUNDS,
};
pub use decoder::{
    check_dimensions, decode_image, detect_format, ensure_dimensions_safe, header_dimensions,
};
pub use encoder::{encode_png, from_data_url, png_data_url, to_data_url, PNG_DATA_URL_PREFIX};
pub use pattern::{test_pattern, test_pattern_image};
pub use pipeline::{FailureReason, RequestPipeline, Stage, StageTimings};
pub use pool::{get_pool, ENV_THREADS, MAX_THREADS};
pub use resize::{calc_resize_dimensions, normalize, resize_grid};
pub use response::{round_metric, ProcessResponse, ProcessSuccess};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::PixelGrid;
    use crate::params::{EncryptionLevel, ResizeStrategy};

    fn engine() -> CipherEngine {
        CipherEngine::new(EngineConfig::default().with_png_optimization(false)).unwrap()
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CipherEngine>();
        assert_send_sync::<ProcessResponse>();
    }

    #[test]
    fn non_square_upload_is_stretched_to_grid() {
        let grid =
            PixelGrid::from_fn(300, 120, 3, |x, y, c| (x / 3 + y + c as u32 * 40) as u8).unwrap();
        let png = encode_png(&grid, false).unwrap();
        let out = engine().process(&png, EncryptionLevel::Low, "stretch-me").unwrap();
        let (img, _) = decode_image(&out.original_png).unwrap();
        assert_eq!((img.width(), img.height()), (GRID_SIZE, GRID_SIZE));
    }

    #[test]
    fn letterbox_config_is_honored() {
        let engine = CipherEngine::new(
            EngineConfig::default()
                .with_resize(ResizeStrategy::Letterbox)
                .with_png_optimization(false),
        )
        .unwrap();
        let white = PixelGrid::from_fn(512, 128, 3, |_, _, _| 255).unwrap();
        let out = engine
            .process(&encode_png(&white, false).unwrap(), EncryptionLevel::Low, "letterbox")
            .unwrap();
        let original = PixelGrid::from_dynamic(decode_image(&out.original_png).unwrap().0).unwrap();
        // top row is padding
        assert!(original.samples()[..(GRID_SIZE as usize * 3)].iter().all(|&v| v == 0));
    }

    #[test]
    fn grayscale_upload_stays_single_channel() {
        let gray = PixelGrid::from_fn(64, 64, 1, |x, y, _| (x * 4 ^ y) as u8).unwrap();
        let out = engine()
            .process(&encode_png(&gray, false).unwrap(), EncryptionLevel::Medium, "gray-key")
            .unwrap();
        assert_eq!(out.channels, 1);
        let decrypted =
            PixelGrid::from_dynamic(decode_image(&out.decrypted_png).unwrap().0).unwrap();
        assert_eq!(decrypted.channels(), 1);
    }

    #[test]
    fn one_by_one_upload_is_processed() {
        let dot = PixelGrid::new(1, 1, 3, vec![12, 34, 56]).unwrap();
        let resp = engine().respond(&encode_png(&dot, false).unwrap(), "high", "tiny-key");
        assert!(resp.is_success());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = EngineConfig::default().with_min_key_chars(0);
        assert!(CipherEngine::new(cfg).is_err());
    }

    #[test]
    fn optimized_png_matches_plain_png_pixels() {
        let pattern = test_pattern().unwrap();
        let plain = encode_png(&pattern, false).unwrap();
        let optimized = encode_png(&pattern, true).unwrap();
        let a = PixelGrid::from_dynamic(decode_image(&plain).unwrap().0).unwrap();
        let b = PixelGrid::from_dynamic(decode_image(&optimized).unwrap().0).unwrap();
        assert_eq!(a, b);
    }
}
