// src/cipher/key.rs
//
// Key scheduling: (key, level) -> ChaoticState.
// Deterministic by construction; decryption must rebuild the exact state
// used for encryption.

use crate::cipher::sequence::{logistic_step, R_FRAC_BITS};
use crate::error::{EndcryptError, Result};
use crate::params::EncryptionLevel;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

/// Domain separation for the seed digest. Changing it changes every ciphertext.
const DOMAIN_TAG: &[u8] = b"endcrypt/logistic/v1";

/// Iterations discarded before the first emitted value.
pub const DEFAULT_TRANSIENT: u32 = 1000;

/// Minimum key length in characters.
pub const DEFAULT_MIN_KEY_CHARS: usize = 4;

// x0 range [0.05, 0.95) in Q0.64
const X0_MIN: u64 = 922_337_203_685_477_580;
const X0_SPAN: u64 = 16_602_069_666_338_596_456;

// r range [3.9, 4.0) in Q2.32, inside the chaotic regime (3.57, 4.0)
const R_MIN: u64 = 16_750_372_454;
const R_SPAN: u64 = 429_496_729;

// Points of the unit interval the seed must avoid
const QUARTER: u64 = 1 << 62;
const HALF: u64 = 1 << 63;
const THREE_QUARTERS: u64 = 3 << 62;

/// Rounds of permutation+diffusion per level. Read-only static configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundTable {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl Default for RoundTable {
    fn default() -> Self {
        // two rounds per level step
        Self {
            low: 2,
            medium: 4,
            high: 6,
        }
    }
}

impl RoundTable {
    pub fn rounds(&self, level: EncryptionLevel) -> u32 {
        match level {
            EncryptionLevel::Low => self.low,
            EncryptionLevel::Medium => self.medium,
            EncryptionLevel::High => self.high,
        }
    }

    /// Rounds must be positive and strictly increasing with the level.
    pub fn validate(&self) -> Result<()> {
        if self.low == 0 || self.low >= self.medium || self.medium >= self.high {
            return Err(EndcryptError::invalid_argument(
                "rounds",
                format!("{},{},{}", self.low, self.medium, self.high),
                "Round counts must satisfy 0 < low < medium < high",
            ));
        }
        Ok(())
    }
}

/// Request-scoped chaotic map parameters.
///
/// Not `Clone`: one state per request. Debug output is redacted and the
/// seed is wiped on drop.
pub struct ChaoticState {
    x0: u64,
    r: u64,
    transient: u32,
    rounds: u32,
    level: EncryptionLevel,
}

impl ChaoticState {
    /// Initial value, Q0.64.
    #[inline]
    pub fn initial(&self) -> u64 {
        self.x0
    }

    /// Control parameter, Q2.32.
    #[inline]
    pub fn control(&self) -> u64 {
        self.r
    }

    #[inline]
    pub fn transient(&self) -> u32 {
        self.transient
    }

    #[inline]
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    #[inline]
    pub fn level(&self) -> EncryptionLevel {
        self.level
    }

    /// Control parameter as a real number, for diagnostics only.
    pub fn control_approx(&self) -> f64 {
        self.r as f64 / (1u64 << R_FRAC_BITS) as f64
    }
}

impl std::fmt::Debug for ChaoticState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaoticState")
            .field("level", &self.level)
            .field("rounds", &self.rounds)
            .field("transient", &self.transient)
            .finish_non_exhaustive()
    }
}

impl Drop for ChaoticState {
    fn drop(&mut self) {
        self.x0.zeroize();
        self.r.zeroize();
    }
}

/// Derives [`ChaoticState`]s from user keys.
#[derive(Clone, Debug)]
pub struct KeyScheduler {
    rounds: RoundTable,
    min_key_chars: usize,
    transient: u32,
}

impl Default for KeyScheduler {
    fn default() -> Self {
        Self::new(RoundTable::default(), DEFAULT_MIN_KEY_CHARS)
    }
}

impl KeyScheduler {
    pub fn new(rounds: RoundTable, min_key_chars: usize) -> Self {
        Self {
            rounds,
            min_key_chars: min_key_chars.max(1),
            transient: DEFAULT_TRANSIENT,
        }
    }

    pub fn round_table(&self) -> &RoundTable {
        &self.rounds
    }

    pub fn derive(&self, key: &str, level: EncryptionLevel) -> Result<ChaoticState> {
        self.check_key(key)?;

        let digest = seed_digest(key, level);
        let x_raw = u64::from_be_bytes(take8(&digest[0..8]));
        let r_raw = u64::from_be_bytes(take8(&digest[8..16]));

        let r = R_MIN + ((r_raw as u128 * R_SPAN as u128) >> 64) as u64;
        let x0 = initial_state(x_raw, r);

        Ok(ChaoticState {
            x0,
            r,
            transient: self.transient,
            rounds: self.rounds.rounds(level),
            level,
        })
    }

    fn check_key(&self, key: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(EndcryptError::invalid_key("key must not be empty"));
        }
        if key.chars().count() < self.min_key_chars {
            return Err(EndcryptError::invalid_key(format!(
                "key must contain at least {} characters",
                self.min_key_chars
            )));
        }
        Ok(())
    }
}

fn seed_digest(key: &str, level: EncryptionLevel) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_TAG);
    hasher.update([level.code()]);
    hasher.update(key.as_bytes());
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&hasher.finalize());
    out
}

fn take8(bytes: &[u8]) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    buf
}

/// Map a raw 64-bit value into [0.05, 0.95), stepping off 1/4, 1/2, 3/4 and
/// off fixed points of the map.
fn initial_state(raw: u64, r: u64) -> u64 {
    let mut x0 = X0_MIN + ((raw as u128 * X0_SPAN as u128) >> 64) as u64;
    // at most a handful of nudges; x0 stays far below 1.0
    while matches!(x0, QUARTER | HALF | THREE_QUARTERS) || logistic_step(x0, r) == x0 {
        x0 += 1;
    }
    x0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let ks = KeyScheduler::default();
        let a = ks.derive("secret-key", EncryptionLevel::High).unwrap();
        let b = ks.derive("secret-key", EncryptionLevel::High).unwrap();
        assert_eq!(a.initial(), b.initial());
        assert_eq!(a.control(), b.control());
        assert_eq!(a.rounds(), 6);
    }

    #[test]
    fn parameters_stay_in_chaotic_domain() {
        let ks = KeyScheduler::default();
        for key in ["abcd", "0.67", "correct horse battery staple", "ключ-шифра"] {
            for level in EncryptionLevel::ALL {
                let s = ks.derive(key, level).unwrap();
                assert!(s.initial() >= X0_MIN && s.initial() < X0_MIN + X0_SPAN);
                assert!(s.control_approx() >= 3.9 && s.control_approx() < 4.0);
            }
        }
    }

    #[test]
    fn level_changes_the_seed() {
        let ks = KeyScheduler::default();
        let low = ks.derive("same key", EncryptionLevel::Low).unwrap();
        let high = ks.derive("same key", EncryptionLevel::High).unwrap();
        assert_ne!(low.initial(), high.initial());
    }

    #[test]
    fn rejects_empty_and_short_keys() {
        let ks = KeyScheduler::default();
        for bad in ["", "   ", "abc"] {
            let err = ks.derive(bad, EncryptionLevel::Low).unwrap_err();
            assert!(matches!(err, EndcryptError::InvalidKey { .. }), "{bad:?}");
        }
        // characters, not bytes
        assert!(ks.derive("äöüß", EncryptionLevel::Low).is_ok());
    }

    #[test]
    fn initial_state_avoids_special_points() {
        let r = R_MIN;
        for target in [QUARTER, HALF, THREE_QUARTERS] {
            // find a raw value mapping exactly onto the special point, if any
            let raw = (((target - X0_MIN) as u128) << 64) / X0_SPAN as u128;
            let x0 = initial_state(raw as u64, r);
            assert_ne!(x0, target);
        }
    }

    #[test]
    fn round_table_validation() {
        assert!(RoundTable::default().validate().is_ok());
        let flat = RoundTable {
            low: 2,
            medium: 2,
            high: 3,
        };
        assert!(flat.validate().is_err());
        let zero = RoundTable {
            low: 0,
            medium: 1,
            high: 2,
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let s = KeyScheduler::default()
            .derive("redact-me", EncryptionLevel::Low)
            .unwrap();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains(&s.initial().to_string()));
        assert!(dbg.contains("Low"));
    }
}
