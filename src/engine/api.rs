// src/engine/api.rs
//
// CipherEngine: the public entry point.
// Ties decoding, normalization, the cipher, metrics and encoding together
// behind the process-image contract.

use crate::cipher::{self, schedule_rounds, CancelFlag, ChaoticState, KeyScheduler};
use crate::engine::common::{retry_transient_io, run_with_panic_policy};
use crate::engine::config::EngineConfig;
use crate::engine::pipeline::{RequestPipeline, Stage, StageTimings};
use crate::engine::response::{ProcessResponse, ProcessSuccess};
use crate::engine::{decoder, encoder, pool, resize, GRID_SIZE};
use crate::error::{EndcryptError, Result};
use crate::grid::PixelGrid;
use crate::metrics::{ImageMetrics, MetricsCalculator};
use crate::params::EncryptionLevel;
use rayon::prelude::*;
use std::path::Path;
use zeroize::Zeroizing;

/// Result of one successful request.
#[derive(Clone, Debug)]
pub struct ProcessOutput {
    pub level: EncryptionLevel,
    pub rounds: u32,
    /// Channels of the normalized grid (1 or 3).
    pub channels: u8,
    pub original_png: Vec<u8>,
    pub encrypted_png: Vec<u8>,
    pub decrypted_png: Vec<u8>,
    pub metrics: ImageMetrics,
    pub timings: StageTimings,
}

impl ProcessOutput {
    pub fn into_response(self) -> ProcessResponse {
        ProcessResponse::Success(Box::new(ProcessSuccess {
            original_image: encoder::to_data_url(&self.original_png),
            encrypted_image: encoder::to_data_url(&self.encrypted_png),
            decrypted_image: encoder::to_data_url(&self.decrypted_png),
            metrics: self.metrics,
        }))
    }
}

/// One entry of a batch. The key is wiped when the request is dropped.
#[derive(Clone)]
pub struct ProcessRequest {
    pub image: Vec<u8>,
    pub level: String,
    pub key: Zeroizing<String>,
}

impl ProcessRequest {
    pub fn new(image: Vec<u8>, level: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            image,
            level: level.into(),
            key: Zeroizing::new(key.into()),
        }
    }
}

impl std::fmt::Debug for ProcessRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("image_bytes", &self.image.len())
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Stateless engine: holds only immutable configuration, so one instance
/// can serve any number of concurrent requests.
#[derive(Clone, Debug)]
pub struct CipherEngine {
    config: EngineConfig,
    scheduler: KeyScheduler,
}

impl Default for CipherEngine {
    fn default() -> Self {
        Self::from_valid_config(EngineConfig::default())
    }
}

impl CipherEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(EngineConfig::from_env()?)
    }

    fn from_valid_config(config: EngineConfig) -> Self {
        let scheduler = KeyScheduler::new(config.rounds, config.min_key_chars);
        Self { config, scheduler }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn key_scheduler(&self) -> &KeyScheduler {
        &self.scheduler
    }

    // =========================================================================
    // PROCESS-IMAGE CONTRACT
    // =========================================================================

    /// Decode, normalize, encrypt, decrypt, measure and encode one upload.
    pub fn process(
        &self,
        bytes: &[u8],
        level: EncryptionLevel,
        key: &str,
    ) -> Result<ProcessOutput> {
        self.process_with_cancel(bytes, level, key, None)
    }

    /// [`process`](Self::process) with cooperative cancellation between rounds.
    pub fn process_with_cancel(
        &self,
        bytes: &[u8],
        level: EncryptionLevel,
        key: &str,
        cancel: Option<&CancelFlag>,
    ) -> Result<ProcessOutput> {
        let mut pipeline = RequestPipeline::new();
        tracing::info!(
            request_id = pipeline.id(),
            input_bytes = bytes.len(),
            level = level.as_str(),
            "processing image"
        );

        // Parameters are checked before any decoding work.
        let state = match self.scheduler.derive(key, level) {
            Ok(state) => state,
            Err(err) => {
                pipeline.fail(&err);
                return Err(err);
            }
        };

        let original = pipeline.run(Stage::Normalized, || self.load_normalized(bytes))?;

        let (encrypted, keys) = pipeline.run(Stage::Encrypted, || {
            let keys = schedule_rounds(&state, original.pixel_count(), original.channels())?;
            let encrypted = run_with_panic_policy("encrypt", || {
                cipher::encrypt(original.clone(), &keys, cancel)
            })?;
            Ok((encrypted, keys))
        })?;

        let decrypted = pipeline.run(Stage::Decrypted, || {
            let decrypted = run_with_panic_policy("decrypt", || {
                cipher::decrypt(encrypted.clone(), &keys, cancel)
            })?;
            if decrypted != original {
                return Err(EndcryptError::internal_panic(
                    "decrypted image does not match the normalized original",
                ));
            }
            Ok(decrypted)
        })?;
        drop(keys);

        let metrics = pipeline.run(Stage::MetricsComputed, || {
            MetricsCalculator::compute(&original, &encrypted, &decrypted)
        })?;

        let optimize = self.config.optimize_png;
        let (original_png, (encrypted_png, decrypted_png)) = pipeline.run(Stage::Responded, || {
            let (o, (e, d)) = rayon::join(
                || encoder::encode_png(&original, optimize),
                || {
                    rayon::join(
                        || encoder::encode_png(&encrypted, optimize),
                        || encoder::encode_png(&decrypted, optimize),
                    )
                },
            );
            Ok((o?, (e?, d?)))
        })?;

        let timings = pipeline.timings();
        tracing::info!(
            request_id = pipeline.id(),
            rounds = state.rounds(),
            encrypted_entropy = metrics.encrypted_entropy,
            total_ms = timings.total.as_secs_f64() * 1000.0,
            "image processed"
        );

        Ok(ProcessOutput {
            level,
            rounds: state.rounds(),
            channels: original.channels(),
            original_png,
            encrypted_png,
            decrypted_png,
            metrics,
            timings,
        })
    }

    /// The endpoint contract: every outcome, panics included, becomes a
    /// [`ProcessResponse`]. `level` accepts names or numeric codes.
    pub fn respond(&self, bytes: &[u8], level: &str, key: &str) -> ProcessResponse {
        let outcome = run_with_panic_policy("process", || {
            let level: EncryptionLevel = level.parse()?;
            self.process(bytes, level, key)
        });
        match outcome {
            Ok(output) => output.into_response(),
            Err(err) => ProcessResponse::failure(&err),
        }
    }

    // =========================================================================
    // ONE-WAY OPERATIONS
    // =========================================================================

    /// Encrypt an encoded image; returns the encrypted grid as PNG.
    pub fn encrypt_image(
        &self,
        bytes: &[u8],
        level: EncryptionLevel,
        key: &str,
    ) -> Result<Vec<u8>> {
        let state = self.scheduler.derive(key, level)?;
        let grid = self.load_normalized(bytes)?;
        let encrypted = run_with_panic_policy("encrypt", || cipher::encrypt_grid(grid, &state))?;
        encoder::encode_png(&encrypted, self.config.optimize_png)
    }

    /// Decrypt a PNG produced by [`encrypt_image`](Self::encrypt_image).
    /// The input must already be a cipher grid; nothing is resized.
    pub fn decrypt_image(
        &self,
        bytes: &[u8],
        level: EncryptionLevel,
        key: &str,
    ) -> Result<Vec<u8>> {
        let state = self.scheduler.derive(key, level)?;
        self.config.enforce_source_len(bytes.len())?;
        let (img, _) = decoder::decode_image(bytes)?;
        let grid = PixelGrid::from_dynamic(img)?;
        if grid.width() != GRID_SIZE || grid.height() != GRID_SIZE {
            return Err(EndcryptError::dimension_mismatch(
                format!("{GRID_SIZE}x{GRID_SIZE}"),
                format!("{}x{}", grid.width(), grid.height()),
            ));
        }
        let decrypted = run_with_panic_policy("decrypt", || cipher::decrypt_grid(grid, &state))?;
        encoder::encode_png(&decrypted, self.config.optimize_png)
    }

    /// Derive the chaotic state for a key without touching any image.
    pub fn derive_state(&self, key: &str, level: EncryptionLevel) -> Result<ChaoticState> {
        self.scheduler.derive(key, level)
    }

    // =========================================================================
    // FILE AND BATCH ENTRY POINTS
    // =========================================================================

    /// Read an image from disk (one retry on transient I/O errors) and process it.
    pub fn process_path(
        &self,
        path: impl AsRef<Path>,
        level: EncryptionLevel,
        key: &str,
    ) -> Result<ProcessOutput> {
        let bytes = read_source(path.as_ref())?;
        self.process(&bytes, level, key)
    }

    /// Run independent requests on the global worker pool.
    /// One response per request, in input order.
    pub fn process_batch(&self, requests: &[ProcessRequest]) -> Vec<ProcessResponse> {
        let pool = match pool::get_pool() {
            Ok(pool) => pool,
            Err(err) => return requests.iter().map(|_| ProcessResponse::failure(&err)).collect(),
        };
        tracing::debug!(
            requests = requests.len(),
            threads = pool.current_num_threads(),
            "processing batch"
        );
        pool.install(|| {
            requests
                .par_iter()
                .map(|req| self.respond(&req.image, &req.level, &req.key))
                .collect()
        })
    }

    fn load_normalized(&self, bytes: &[u8]) -> Result<PixelGrid> {
        self.config.enforce_source_len(bytes.len())?;
        if let Some((width, height)) = decoder::header_dimensions(bytes) {
            self.config.enforce_pixels(width, height)?;
        }
        let (img, format) = decoder::decode_image(bytes)?;
        self.config.enforce_pixels(img.width(), img.height())?;
        tracing::debug!(
            format = ?format,
            width = img.width(),
            height = img.height(),
            "decoded upload"
        );
        run_with_panic_policy("normalize", || resize::normalize(img, GRID_SIZE, self.config.resize))
    }
}

/// Read a whole file, retrying once on a transient error.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    retry_transient_io("read", || std::fs::read(path))
        .map_err(|e| EndcryptError::file_read_failed(path.display().to_string(), e))
}
