// src/engine/config.rs
//
// Static engine configuration: round table, key policy, input limits,
// normalization strategy and PNG optimization.
// Shared read-only across requests.

use crate::cipher::key::{RoundTable, DEFAULT_MIN_KEY_CHARS};
use crate::error::{EndcryptError, Result};
use crate::params::ResizeStrategy;

const DEFAULT_MAX_INPUT_BYTES: u64 = 20 * 1024 * 1024; // 20MB upload cap
const DEFAULT_MAX_PIXELS: u64 = 40_000_000; // ~8K x 5K before normalization

pub const ENV_ROUNDS: &str = "ENDCRYPT_ROUNDS";
pub const ENV_MIN_KEY_CHARS: &str = "ENDCRYPT_MIN_KEY_CHARS";
pub const ENV_MAX_INPUT_BYTES: &str = "ENDCRYPT_MAX_INPUT_BYTES";
pub const ENV_RESIZE: &str = "ENDCRYPT_RESIZE";
pub const ENV_PNG_OPTIMIZE: &str = "ENDCRYPT_PNG_OPTIMIZE";

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub rounds: RoundTable,
    pub min_key_chars: usize,
    pub max_input_bytes: u64,
    pub max_pixels: u64,
    pub resize: ResizeStrategy,
    /// Re-compress output PNGs losslessly with oxipng.
    pub optimize_png: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rounds: RoundTable::default(),
            min_key_chars: DEFAULT_MIN_KEY_CHARS,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_pixels: DEFAULT_MAX_PIXELS,
            resize: ResizeStrategy::Stretch,
            optimize_png: true,
        }
    }
}

impl EngineConfig {
    pub fn with_rounds(mut self, rounds: RoundTable) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_min_key_chars(mut self, chars: usize) -> Self {
        self.min_key_chars = chars;
        self
    }

    pub fn with_max_input_bytes(mut self, bytes: u64) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    pub fn with_max_pixels(mut self, pixels: u64) -> Self {
        self.max_pixels = pixels;
        self
    }

    pub fn with_resize(mut self, resize: ResizeStrategy) -> Self {
        self.resize = resize;
        self
    }

    pub fn with_png_optimization(mut self, enabled: bool) -> Self {
        self.optimize_png = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.rounds.validate()?;
        if self.min_key_chars == 0 {
            return Err(EndcryptError::invalid_argument(
                "min_key_chars",
                "0",
                "Keys must require at least one character",
            ));
        }
        if self.max_input_bytes == 0 {
            return Err(EndcryptError::invalid_argument(
                "max_input_bytes",
                "0",
                "Input limit must be positive",
            ));
        }
        if self.max_pixels == 0 {
            return Err(EndcryptError::invalid_argument(
                "max_pixels",
                "0",
                "Pixel limit must be positive",
            ));
        }
        Ok(())
    }

    /// Defaults overridden by `ENDCRYPT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ROUNDS) {
            config.rounds = parse_rounds(&raw)?;
        }
        if let Some(raw) = lookup(ENV_MIN_KEY_CHARS) {
            config.min_key_chars = parse_number(ENV_MIN_KEY_CHARS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_INPUT_BYTES) {
            config.max_input_bytes = parse_number(ENV_MAX_INPUT_BYTES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RESIZE) {
            config.resize = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_PNG_OPTIMIZE) {
            config.optimize_png = parse_flag(ENV_PNG_OPTIMIZE, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject uploads over the byte limit before decoding.
    pub fn enforce_source_len(&self, len: usize) -> Result<()> {
        let len = len as u64;
        if len > self.max_input_bytes {
            return Err(EndcryptError::input_too_large(len, self.max_input_bytes));
        }
        Ok(())
    }

    /// Reject decoded images over the pixel limit before normalization.
    pub fn enforce_pixels(&self, width: u32, height: u32) -> Result<()> {
        let pixels = width as u64 * height as u64;
        if pixels > self.max_pixels {
            return Err(EndcryptError::pixel_count_exceeds_limit(pixels, self.max_pixels));
        }
        Ok(())
    }
}

/// `"low,medium,high"`, e.g. `"2,4,6"`.
fn parse_rounds(raw: &str) -> Result<RoundTable> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [low, medium, high] = parts.as_slice() else {
        return Err(EndcryptError::invalid_argument(
            ENV_ROUNDS,
            raw.to_string(),
            "Expected three comma-separated round counts (low,medium,high)",
        ));
    };
    Ok(RoundTable {
        low: parse_number(ENV_ROUNDS, low)?,
        medium: parse_number(ENV_ROUNDS, medium)?,
        high: parse_number(ENV_ROUNDS, high)?,
    })
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        EndcryptError::invalid_argument(name, raw.to_string(), "Expected a non-negative integer")
    })
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EndcryptError::invalid_argument(
            name,
            raw.to_string(),
            "Expected true or false",
        )),
    }
}
