// src/cipher.rs
//
// Chaotic image cipher: r rounds of (permutation, diffusion).
//
// One sequence drives every round. Per round, in this order:
//   n-1 position draws, n*c diffusion operands, 1 IV byte
// where n = width*height and c = channels. Decryption rebuilds the same
// round keys and applies the inverses in reverse round order.

pub mod diffusion;
pub mod key;
pub mod permutation;
pub mod sequence;

pub use diffusion::{diffuse, undiffuse, DiffusionKey};
pub use key::{ChaoticState, KeyScheduler, RoundTable};
pub use permutation::{permute, unpermute, Permutation};
pub use sequence::ChaoticSequence;

use crate::error::{EndcryptError, Result};
use crate::grid::PixelGrid;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation, observed only between rounds.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Key material for one round.
#[derive(Debug)]
pub struct RoundKey {
    pub permutation: Permutation,
    pub diffusion: DiffusionKey,
}

/// Number of sequence values consumed by `rounds` rounds over a grid.
pub fn sequence_len(rounds: u32, pixels: usize, channels: u8) -> usize {
    let per_round = pixels.saturating_sub(1) + pixels * channels as usize + 1;
    per_round * rounds as usize
}

/// Expand a state into per-round keys for grids of the given shape.
pub fn schedule_rounds(state: &ChaoticState, pixels: usize, channels: u8) -> Result<Vec<RoundKey>> {
    let mut seq = ChaoticSequence::generate(state, sequence_len(state.rounds(), pixels, channels));
    let samples = pixels * channels as usize;
    (0..state.rounds())
        .map(|_| {
            let permutation = Permutation::from_sequence(&mut seq, pixels)?;
            let diffusion = DiffusionKey::from_sequence(&mut seq, samples)?;
            Ok(RoundKey {
                permutation,
                diffusion,
            })
        })
        .collect()
}

fn check_cancel(cancel: Option<&CancelFlag>, completed_rounds: u32) -> Result<()> {
    match cancel {
        Some(flag) if flag.is_cancelled() => Err(EndcryptError::cancelled(completed_rounds)),
        _ => Ok(()),
    }
}

/// Permutation then diffusion, once per round key.
pub fn encrypt(
    mut grid: PixelGrid,
    keys: &[RoundKey],
    cancel: Option<&CancelFlag>,
) -> Result<PixelGrid> {
    for (done, round) in keys.iter().enumerate() {
        check_cancel(cancel, done as u32)?;
        grid = permute(grid, &round.permutation)?;
        grid = diffuse(grid, &round.diffusion)?;
    }
    Ok(grid)
}

/// Inverse diffusion then inverse permutation, rounds in reverse order.
pub fn decrypt(
    mut grid: PixelGrid,
    keys: &[RoundKey],
    cancel: Option<&CancelFlag>,
) -> Result<PixelGrid> {
    for (done, round) in keys.iter().rev().enumerate() {
        check_cancel(cancel, done as u32)?;
        grid = undiffuse(grid, &round.diffusion)?;
        grid = unpermute(grid, &round.permutation)?;
    }
    Ok(grid)
}

/// Schedule and encrypt in one call.
pub fn encrypt_grid(grid: PixelGrid, state: &ChaoticState) -> Result<PixelGrid> {
    let keys = schedule_rounds(state, grid.pixel_count(), grid.channels())?;
    encrypt(grid, &keys, None)
}

/// Schedule and decrypt in one call.
pub fn decrypt_grid(grid: PixelGrid, state: &ChaoticState) -> Result<PixelGrid> {
    let keys = schedule_rounds(state, grid.pixel_count(), grid.channels())?;
    decrypt(grid, &keys, None)
}
