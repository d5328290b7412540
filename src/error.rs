// src/error.rs
//
// Unified error handling for endcrypt
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Invalid key/level/argument, recoverable
// - CodecError: Decode/encode/resize issues
// - ResourceLimit: Input size/dimension limits, file access
// - InternalBug: Engine bugs (should not happen)

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy used for response mapping and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by user
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Size limits and file access
    ResourceLimit,
    /// Engine bugs (should not happen)
    InternalBug,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }

    /// HTTP status a host may attach to a failure response.
    /// The JSON body is the contract; the status is advisory.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCategory::UserError | ErrorCategory::CodecError => 400,
            ErrorCategory::ResourceLimit => 413,
            ErrorCategory::InternalBug => 500,
        }
    }
}

/// endcrypt error types
///
/// Every error is request-local. None of them carries key material.
#[derive(Debug, Error)]
pub enum EndcryptError {
    // Request parameter errors
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: Cow<'static, str> },

    #[error("Invalid encryption level '{value}'. Expected low, medium, high (or 1, 2, 3)")]
    InvalidLevel { value: Cow<'static, str> },

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Processing cancelled after round {completed_rounds}")]
    Cancelled { completed_rounds: u32 },

    // Codec errors
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    // Size limit errors
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    #[error("Input size {bytes} bytes exceeds limit of {max} bytes")]
    InputTooLarge { bytes: u64, max: u64 },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Internal errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: Cow<'static, str>,
        actual: Cow<'static, str>,
    },

    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

impl Clone for EndcryptError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidKey { reason } => Self::InvalidKey {
                reason: reason.clone(),
            },
            Self::InvalidLevel { value } => Self::InvalidLevel {
                value: value.clone(),
            },
            Self::InvalidArgument {
                name,
                value,
                reason,
            } => Self::InvalidArgument {
                name: name.clone(),
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::Cancelled { completed_rounds } => Self::Cancelled {
                completed_rounds: *completed_rounds,
            },
            Self::DecodeFailed { message } => Self::DecodeFailed {
                message: message.clone(),
            },
            Self::EncodeFailed { format, message } => Self::EncodeFailed {
                format: format.clone(),
                message: message.clone(),
            },
            Self::ResizeFailed {
                source_width,
                source_height,
                target_width,
                target_height,
                message,
            } => Self::ResizeFailed {
                source_width: *source_width,
                source_height: *source_height,
                target_width: *target_width,
                target_height: *target_height,
                message: message.clone(),
            },
            Self::DimensionExceedsLimit { dimension, max } => Self::DimensionExceedsLimit {
                dimension: *dimension,
                max: *max,
            },
            Self::PixelCountExceedsLimit { pixels, max } => Self::PixelCountExceedsLimit {
                pixels: *pixels,
                max: *max,
            },
            Self::InputTooLarge { bytes, max } => Self::InputTooLarge {
                bytes: *bytes,
                max: *max,
            },
            Self::FileReadFailed { path, source } => Self::FileReadFailed {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Self::DimensionMismatch { expected, actual } => Self::DimensionMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Self::InternalPanic { message } => Self::InternalPanic {
                message: message.clone(),
            },
        }
    }
}

// Constructor Helpers
impl EndcryptError {
    pub fn invalid_key(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidKey {
            reason: reason.into(),
        }
    }

    pub fn invalid_level(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidLevel {
            value: value.into(),
        }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn cancelled(completed_rounds: u32) -> Self {
        Self::Cancelled { completed_rounds }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn input_too_large(bytes: u64, max: u64) -> Self {
        Self::InputTooLarge { bytes, max }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn dimension_mismatch(
        expected: impl Into<Cow<'static, str>>,
        actual: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (user can fix it)
    ///
    /// Consistent with category():
    /// - UserError and ResourceLimit errors are recoverable
    /// - CodecError and InternalBug errors are not
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::ResourceLimit => true,
            ErrorCategory::CodecError | ErrorCategory::InternalBug => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidKey { .. }
            | Self::InvalidLevel { .. }
            | Self::InvalidArgument { .. }
            | Self::Cancelled { .. } => ErrorCategory::UserError,

            Self::DecodeFailed { .. } | Self::EncodeFailed { .. } | Self::ResizeFailed { .. } => {
                ErrorCategory::CodecError
            }

            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::InputTooLarge { .. }
            | Self::FileReadFailed { .. } => ErrorCategory::ResourceLimit,

            // DimensionMismatch only surfaces when a stage is handed a grid of the
            // wrong shape; the orchestrator normalizes before any such call.
            Self::DimensionMismatch { .. } | Self::InternalPanic { .. } => {
                ErrorCategory::InternalBug
            }
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, EndcryptError>;
