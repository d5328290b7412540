// src/cipher/diffusion.rs
//
// Chained value diffusion over the flat sample scan order.
//
//   c[i] = ((p[i] ^ k[i]) + c[i-1]) mod 256,   c[-1] = iv
//   p[i] = ((c[i] - c[i-1]) mod 256) ^ k[i]
//
// Inversion uses the *encrypted* predecessor, so undiffuse can run in the
// same forward scan order.

use crate::cipher::sequence::ChaoticSequence;
use crate::error::{EndcryptError, Result};
use crate::grid::PixelGrid;
use zeroize::Zeroize;

/// Keystream for one diffusion pass. Wiped on drop.
#[derive(Clone)]
pub struct DiffusionKey {
    iv: u8,
    operands: Vec<u8>,
}

impl DiffusionKey {
    pub fn new(iv: u8, operands: Vec<u8>) -> Self {
        Self { iv, operands }
    }

    /// Draw `len` operands, then the IV, from the sequence.
    pub fn from_sequence(seq: &mut ChaoticSequence, len: usize) -> Result<Self> {
        let exhausted = || EndcryptError::internal_panic("chaotic sequence exhausted");
        let mut operands = Vec::with_capacity(len);
        for _ in 0..len {
            operands.push(seq.next_byte().ok_or_else(exhausted)?);
        }
        let iv = seq.next_byte().ok_or_else(exhausted)?;
        Ok(Self { iv, operands })
    }

    pub fn iv(&self) -> u8 {
        self.iv
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    fn ensure_fits(&self, grid: &PixelGrid) -> Result<()> {
        if self.operands.len() != grid.samples().len() {
            return Err(EndcryptError::dimension_mismatch(
                format!("{} samples", self.operands.len()),
                format!("{} samples ({})", grid.samples().len(), grid.shape_label()),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DiffusionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffusionKey")
            .field("len", &self.operands.len())
            .finish_non_exhaustive()
    }
}

impl Drop for DiffusionKey {
    fn drop(&mut self) {
        self.iv.zeroize();
        self.operands.zeroize();
    }
}

/// Forward diffusion. Consumes the grid and rewrites its buffer.
pub fn diffuse(mut grid: PixelGrid, key: &DiffusionKey) -> Result<PixelGrid> {
    key.ensure_fits(&grid)?;
    let mut prev = key.iv;
    for (sample, &k) in grid.samples_mut().iter_mut().zip(&key.operands) {
        *sample = (*sample ^ k).wrapping_add(prev);
        prev = *sample;
    }
    Ok(grid)
}

/// Inverse of [`diffuse`] for the same key.
pub fn undiffuse(mut grid: PixelGrid, key: &DiffusionKey) -> Result<PixelGrid> {
    key.ensure_fits(&grid)?;
    let mut prev = key.iv;
    for (sample, &k) in grid.samples_mut().iter_mut().zip(&key.operands) {
        let cipher = *sample;
        *sample = cipher.wrapping_sub(prev) ^ k;
        prev = cipher;
    }
    Ok(grid)
}
