// src/cipher/permutation.rs
//
// Position scrambling (confusion).
//
// All channels of a pixel move together: the permutation acts on the
// width*height positions, not on individual samples.

use crate::cipher::sequence::ChaoticSequence;
use crate::error::{EndcryptError, Result};
use crate::grid::PixelGrid;

/// Forward position map: pixel `i` moves to `forward[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    forward: Vec<u32>,
}

impl Permutation {
    pub fn identity(len: usize) -> Result<Self> {
        let len = checked_len(len)?;
        Ok(Self {
            forward: (0..len).collect(),
        })
    }

    /// Cyclic permutation of `len` positions (Sattolo's variant of
    /// Fisher-Yates). Consumes `len - 1` values from the sequence.
    ///
    /// For `len > 1` the result is a single cycle, so no position maps to
    /// itself; `len <= 1` yields the identity.
    pub fn from_sequence(seq: &mut ChaoticSequence, len: usize) -> Result<Self> {
        let mut forward: Vec<u32> = (0..checked_len(len)?).collect();
        for i in (1..forward.len()).rev() {
            let j = seq
                .next_index(i as u32)
                .ok_or_else(|| EndcryptError::internal_panic("chaotic sequence exhausted"))?;
            forward.swap(i, j as usize);
        }
        Ok(Self { forward })
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.forward
    }

    pub fn fixed_points(&self) -> usize {
        self.forward
            .iter()
            .enumerate()
            .filter(|(i, &dst)| *i == dst as usize)
            .count()
    }

    fn ensure_fits(&self, grid: &PixelGrid) -> Result<()> {
        if self.forward.len() != grid.pixel_count() {
            return Err(EndcryptError::dimension_mismatch(
                format!("{} pixels", self.forward.len()),
                format!("{} pixels ({})", grid.pixel_count(), grid.shape_label()),
            ));
        }
        Ok(())
    }
}

fn checked_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        EndcryptError::invalid_argument(
            "pixel count",
            len.to_string(),
            "Permutations are limited to u32 positions",
        )
    })
}

/// Move every pixel to its permuted position.
pub fn permute(grid: PixelGrid, perm: &Permutation) -> Result<PixelGrid> {
    perm.ensure_fits(&grid)?;
    let c = grid.channels() as usize;
    let src = grid.samples();
    let mut out = vec![0u8; src.len()];
    for (pixel, &dst) in src.chunks_exact(c).zip(&perm.forward) {
        let at = dst as usize * c;
        out[at..at + c].copy_from_slice(pixel);
    }
    PixelGrid::new(grid.width(), grid.height(), grid.channels(), out)
}

/// Inverse of [`permute`] for the same permutation.
pub fn unpermute(grid: PixelGrid, perm: &Permutation) -> Result<PixelGrid> {
    perm.ensure_fits(&grid)?;
    let c = grid.channels() as usize;
    let src = grid.samples();
    let mut out = vec![0u8; src.len()];
    for (pixel, &from) in out.chunks_exact_mut(c).zip(&perm.forward) {
        let at = from as usize * c;
        pixel.copy_from_slice(&src[at..at + c]);
    }
    PixelGrid::new(grid.width(), grid.height(), grid.channels(), out)
}
