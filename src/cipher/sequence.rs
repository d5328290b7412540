// src/cipher/sequence.rs
//
// Fixed-point logistic map sequence.
//
// x(n+1) = r * x(n) * (1 - x(n)), evaluated entirely in integers:
// - x is Q0.64 (u64, value = x / 2^64)
// - r is Q2.32 (u64, value = r / 2^32), always < 4
// Products are widened to u128, so every platform produces the same bits.

use crate::cipher::key::ChaoticState;
use zeroize::Zeroize;

/// Fractional bits of the control parameter `r`.
pub(crate) const R_FRAC_BITS: u32 = 32;

/// Re-seed constant used when the orbit collapses onto the absorbing state 0.
const COLLAPSE_RESEED: u64 = 0x6A09_E667_F3BC_C908;
/// Odd 64-bit constant (2^64 / golden ratio) mixed with the step counter on re-seed.
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// One iteration of the logistic map in fixed point.
#[inline]
pub(crate) fn logistic_step(x: u64, r: u64) -> u64 {
    let x = x as u128;
    // x * (1 - x) in Q0.64; at most 2^62
    let spread = (x * ((1u128 << 64) - x)) >> 64;
    // r < 4 and spread <= 1/4, so the product stays below 2^64 after the shift
    ((r as u128 * spread) >> R_FRAC_BITS) as u64
}

/// Iteration with counter perturbation.
///
/// Finite precision turns the map into a finite state machine with short
/// cycles; XORing the step counter into the lowest byte (2^-56 of the unit
/// interval) breaks them without disturbing the dynamics.
#[inline]
fn advance(state: u64, r: u64, counter: u64) -> u64 {
    let next = logistic_step(state, r) ^ (counter & 0xFF);
    if next == 0 {
        (COLLAPSE_RESEED ^ counter.wrapping_mul(GOLDEN_GAMMA)) | 1
    } else {
        next
    }
}

/// Byte operand taken from the middle of the state.
///
/// The high bits follow the arcsine density of the logistic map; bits
/// 24..32 are close to uniform.
#[inline]
pub fn byte_of(value: u64) -> u8 {
    (value >> 24) as u8
}

/// Position index in `[0, bound)` from bits 16..48 of the state.
///
/// Uses a u32 x u32 -> u64 multiply-high so the result never depends on
/// the width of `usize`.
#[inline]
pub fn index_of(value: u64, bound: u32) -> u32 {
    let fraction = (value >> 16) as u32;
    ((fraction as u64 * bound as u64) >> 32) as u32
}

/// Lazy, finite, restartable chaotic sequence.
///
/// Two sequences generated from equal [`ChaoticState`]s yield identical
/// values, bit for bit.
pub struct ChaoticSequence {
    r: u64,
    /// State right after the transient, used by `restart`.
    origin: u64,
    origin_counter: u64,
    state: u64,
    counter: u64,
    produced: usize,
    count: usize,
}

impl ChaoticSequence {
    /// Prepare a sequence of `count` values. The first `state.transient()`
    /// iterations are discarded.
    pub fn generate(state: &ChaoticState, count: usize) -> Self {
        let r = state.control();
        let mut x = state.initial();
        let mut counter = 0u64;
        for _ in 0..state.transient() {
            counter += 1;
            x = advance(x, r, counter);
        }

        Self {
            r,
            origin: x,
            origin_counter: counter,
            state: x,
            counter,
            produced: 0,
            count,
        }
    }

    /// Rewind to the first value.
    pub fn restart(&mut self) {
        self.state = self.origin;
        self.counter = self.origin_counter;
        self.produced = 0;
    }

    pub fn remaining(&self) -> usize {
        self.count - self.produced
    }

    /// Total number of iterations performed, transient included.
    pub fn iterations(&self) -> u64 {
        self.counter
    }

    pub fn next_byte(&mut self) -> Option<u8> {
        self.next().map(byte_of)
    }

    pub fn next_index(&mut self, bound: u32) -> Option<u32> {
        self.next().map(|v| index_of(v, bound))
    }
}

impl Iterator for ChaoticSequence {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.produced >= self.count {
            return None;
        }
        self.counter += 1;
        self.state = advance(self.state, self.r, self.counter);
        self.produced += 1;
        Some(self.state)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChaoticSequence {}

impl Drop for ChaoticSequence {
    fn drop(&mut self) {
        self.r.zeroize();
        self.origin.zeroize();
        self.state.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::key::KeyScheduler;
    use crate::params::EncryptionLevel;

    fn state(key: &str) -> ChaoticState {
        KeyScheduler::default()
            .derive(key, EncryptionLevel::Medium)
            .unwrap()
    }

    const HALF: u64 = 1 << 63;

    #[test]
    fn logistic_step_matches_real_map_at_half() {
        // r = 4 - 2^-32 (largest representable), x = 0.5 -> r/4
        let r = (4u64 << R_FRAC_BITS) - 1;
        let next = logistic_step(HALF, r);
        let expected = ((r as u128) << 30) as u64;
        assert_eq!(next, expected);
    }

    #[test]
    fn logistic_step_zero_is_absorbing() {
        assert_eq!(logistic_step(0, 3 << R_FRAC_BITS), 0);
    }

    #[test]
    fn advance_never_returns_zero() {
        assert_ne!(advance(0, 3 << R_FRAC_BITS, 0), 0);
        assert_ne!(advance(1, 3 << R_FRAC_BITS, 256), 0);
    }

    #[test]
    fn sequence_is_reproducible() {
        let a: Vec<u64> = ChaoticSequence::generate(&state("reproducible"), 512).collect();
        let b: Vec<u64> = ChaoticSequence::generate(&state("reproducible"), 512).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn sequence_is_finite() {
        let mut seq = ChaoticSequence::generate(&state("finite"), 3);
        assert_eq!(seq.len(), 3);
        assert!(seq.next().is_some());
        assert!(seq.next_byte().is_some());
        assert!(seq.next_index(10).is_some());
        assert_eq!(seq.next(), None);
        assert_eq!(seq.remaining(), 0);
    }

    #[test]
    fn restart_replays_values() {
        let mut seq = ChaoticSequence::generate(&state("restart"), 64);
        let first: Vec<u64> = seq.by_ref().take(40).collect();
        seq.restart();
        let again: Vec<u64> = seq.by_ref().take(40).collect();
        assert_eq!(first, again);
        assert_eq!(seq.remaining(), 24);
    }

    #[test]
    fn transient_is_counted() {
        let s = state("transient");
        let seq = ChaoticSequence::generate(&s, 0);
        assert_eq!(seq.iterations(), s.transient() as u64);
    }

    #[test]
    fn index_stays_in_bounds() {
        for bound in [1u32, 2, 3, 255, 65_536] {
            let seq = ChaoticSequence::generate(&state("bounds"), 2_000);
            for v in seq {
                assert!(index_of(v, bound) < bound);
            }
        }
        assert_eq!(index_of(u64::MAX, 7), 6);
        assert_eq!(index_of(0, 7), 0);
    }

    #[test]
    fn bytes_are_well_spread() {
        let mut hist = [0u32; 256];
        let n = 65_536;
        for v in ChaoticSequence::generate(&state("histogram"), n) {
            hist[byte_of(v) as usize] += 1;
        }
        // uniform expectation is 256 per bin
        let (min, max) = (hist.iter().min().unwrap(), hist.iter().max().unwrap());
        assert!(*min > 150, "min bin {min}");
        assert!(*max < 380, "max bin {max}");
    }

    #[test]
    fn different_keys_diverge_immediately() {
        let a: Vec<u8> = ChaoticSequence::generate(&state("password1"), 64)
            .map(byte_of)
            .collect();
        let b: Vec<u8> = ChaoticSequence::generate(&state("password2"), 64)
            .map(byte_of)
            .collect();
        let same = a.iter().zip(&b).filter(|(x, y)| x == y).count();
        assert!(same < 8, "{same} equal bytes");
    }
}
