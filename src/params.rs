// src/params.rs
//
// Request parameters.
// Cheap, Copy, self-contained values parsed once at the request boundary.

use crate::error::EndcryptError;
use std::fmt;
use std::str::FromStr;

/// Encryption level selected by the caller.
///
/// Each level maps to a round count in [`crate::cipher::RoundTable`];
/// higher levels run more permutation+diffusion rounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncryptionLevel {
    Low,
    Medium,
    High,
}

impl EncryptionLevel {
    pub const ALL: [EncryptionLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Numeric code used by the front-end form (1-3).
    pub fn code(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }
}

impl FromStr for EncryptionLevel {
    type Err = EndcryptError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "low" | "1" => Ok(Self::Low),
            "medium" | "med" | "2" => Ok(Self::Medium),
            "high" | "3" => Ok(Self::High),
            _ => Err(EndcryptError::invalid_level(value.to_string())),
        }
    }
}

impl fmt::Display for EncryptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How non-256x256 uploads are brought onto the fixed grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResizeStrategy {
    /// Scale each axis independently to the grid size (aspect ratio is not kept).
    #[default]
    Stretch,
    /// Fit inside the grid keeping aspect ratio, pad the rest with black.
    Letterbox,
}

impl FromStr for ResizeStrategy {
    type Err = EndcryptError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "stretch" | "fill" => Ok(Self::Stretch),
            "letterbox" | "inside" => Ok(Self::Letterbox),
            other => Err(EndcryptError::invalid_argument(
                "resize",
                other.to_string(),
                "Expected stretch or letterbox",
            )),
        }
    }
}
