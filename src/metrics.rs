// src/metrics.rs
//
// Quality/security metrics over pixel grids.
// Pure functions: no allocation beyond a 256-bin histogram, no side effects.

use crate::error::{EndcryptError, Result};
use crate::grid::PixelGrid;

/// Peak sample value for 8-bit images.
const MAX_SAMPLE: f64 = 255.0;

/// Upper bounds (inclusive) of the low and mid distribution buckets.
pub const LOW_MAX: u8 = 85;
pub const MID_MAX: u8 = 170;

fn histogram(grid: &PixelGrid) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for &s in grid.samples() {
        bins[s as usize] += 1;
    }
    bins
}

/// Shannon entropy in bits per sample, `0.0..=8.0`.
pub fn entropy(grid: &PixelGrid) -> f64 {
    let total = grid.samples().len();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h: f64 = histogram(grid)
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();
    // -0.0 for single-valued images
    h.max(0.0)
}

/// Peak signal-to-noise ratio in dB. `f64::INFINITY` when the grids are equal.
pub fn psnr(a: &PixelGrid, b: &PixelGrid) -> Result<f64> {
    if !a.same_shape(b) {
        return Err(EndcryptError::dimension_mismatch(a.shape_label(), b.shape_label()));
    }
    let squared: u64 = a
        .samples()
        .iter()
        .zip(b.samples())
        .map(|(&x, &y)| {
            let d = x.abs_diff(y) as u64;
            d * d
        })
        .sum();
    if squared == 0 {
        return Ok(f64::INFINITY);
    }
    let mse = squared as f64 / a.samples().len() as f64;
    Ok(10.0 * (MAX_SAMPLE * MAX_SAMPLE / mse).log10())
}

/// Sample counts in `[0,85]`, `[86,170]`, `[171,255]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Distribution {
    pub low: u64,
    pub mid: u64,
    pub high: u64,
}

impl Distribution {
    pub fn total(&self) -> u64 {
        self.low + self.mid + self.high
    }

    /// Truncated integer percentages `(low, mid, high)`.
    pub fn percentages(&self) -> (u8, u8, u8) {
        let total = self.total();
        if total == 0 {
            return (0, 0, 0);
        }
        let pct = |n: u64| (n * 100 / total) as u8;
        (pct(self.low), pct(self.mid), pct(self.high))
    }
}

pub fn distribution(grid: &PixelGrid) -> Distribution {
    let bins = histogram(grid);
    let sum = |range: std::ops::RangeInclusive<usize>| bins[range].iter().sum::<u64>();
    Distribution {
        low: sum(0..=LOW_MAX as usize),
        mid: sum(LOW_MAX as usize + 1..=MID_MAX as usize),
        high: sum(MID_MAX as usize + 1..=255),
    }
}

/// Metrics for one original/encrypted/decrypted triple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageMetrics {
    pub original_entropy: f64,
    pub encrypted_entropy: f64,
    pub decrypted_entropy: f64,
    /// PSNR(original, encrypted); low for a good cipher.
    pub encrypted_psnr: f64,
    /// PSNR(original, decrypted); infinite for exact recovery.
    pub decrypted_psnr: f64,
    /// Distribution of the encrypted image.
    pub distribution: Distribution,
}

pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Entropies, PSNRs and the distribution are independent; they are
    /// evaluated concurrently on the rayon pool.
    pub fn compute(
        original: &PixelGrid,
        encrypted: &PixelGrid,
        decrypted: &PixelGrid,
    ) -> Result<ImageMetrics> {
        let ((original_entropy, (encrypted_entropy, decrypted_entropy)), (psnrs, distribution)) =
            rayon::join(
                || {
                    rayon::join(
                        || entropy(original),
                        || rayon::join(|| entropy(encrypted), || entropy(decrypted)),
                    )
                },
                || {
                    rayon::join(
                        || rayon::join(|| psnr(original, encrypted), || psnr(original, decrypted)),
                        || distribution(encrypted),
                    )
                },
            );
        let (encrypted_psnr, decrypted_psnr) = psnrs;

        Ok(ImageMetrics {
            original_entropy,
            encrypted_entropy,
            decrypted_entropy,
            encrypted_psnr: encrypted_psnr?,
            decrypted_psnr: decrypted_psnr?,
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(values: Vec<u8>) -> PixelGrid {
        PixelGrid::new(values.len() as u32, 1, 1, values).unwrap()
    }

    #[test]
    fn entropy_of_constant_image_is_zero() {
        assert_eq!(entropy(&grid(vec![9; 100])), 0.0);
    }

    #[test]
    fn entropy_of_all_values_is_eight() {
        let values: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        assert!((entropy(&grid(values)) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_of_two_values_is_one() {
        let values: Vec<u8> = [0u8, 255].iter().copied().cycle().take(64).collect();
        assert!((entropy(&grid(values)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_of_empty_grid_is_zero() {
        let empty = PixelGrid::new(0, 0, 1, Vec::new()).unwrap();
        assert_eq!(entropy(&empty), 0.0);
    }

    #[test]
    fn psnr_identical_is_infinite() {
        let a = grid(vec![1, 2, 3]);
        assert_eq!(psnr(&a, &a.clone()).unwrap(), f64::INFINITY);
    }

    #[test]
    fn psnr_known_value() {
        // MSE = 1 -> 10*log10(65025) = 48.1308...
        let v = psnr(&grid(vec![10, 10]), &grid(vec![11, 9])).unwrap();
        assert!((v - 48.130_803_608).abs() < 1e-6, "{v}");
    }

    #[test]
    fn psnr_extremes() {
        // MSE = 255^2 -> 0 dB
        let v = psnr(&grid(vec![0; 4]), &grid(vec![255; 4])).unwrap();
        assert!(v.abs() < 1e-12);
    }

    #[test]
    fn psnr_rejects_shape_mismatch() {
        let err = psnr(&grid(vec![0; 4]), &grid(vec![0; 5])).unwrap_err();
        assert!(matches!(err, EndcryptError::DimensionMismatch { .. }));
        let rgb = PixelGrid::new(1, 1, 3, vec![0; 3]).unwrap();
        let gray = PixelGrid::new(3, 1, 1, vec![0; 3]).unwrap();
        assert!(psnr(&rgb, &gray).is_err());
    }

    #[test]
    fn distribution_bucket_edges() {
        let d = distribution(&grid(vec![0, 85, 86, 170, 171, 255, 255]));
        assert_eq!(d, Distribution { low: 2, mid: 2, high: 3 });
        assert_eq!(d.total(), 7);
    }

    #[test]
    fn distribution_sums_to_sample_count() {
        let g =
            PixelGrid::from_fn(13, 7, 3, |x, y, c| (x * 31 + y * 17 + c as u32 * 5) as u8).unwrap();
        assert_eq!(distribution(&g).total(), 13 * 7 * 3);
    }

    #[test]
    fn percentages_truncate() {
        let d = Distribution { low: 1, mid: 1, high: 1 };
        assert_eq!(d.percentages(), (33, 33, 33));
        assert_eq!(Distribution::default().percentages(), (0, 0, 0));
    }

    #[test]
    fn compute_matches_individual_functions() {
        let original = grid((0..64).collect());
        let encrypted = grid((0..64).map(|v: u8| v.wrapping_mul(97).wrapping_add(13)).collect());
        let m = MetricsCalculator::compute(&original, &encrypted, &original.clone()).unwrap();
        assert_eq!(m.original_entropy, entropy(&original));
        assert_eq!(m.encrypted_entropy, entropy(&encrypted));
        assert_eq!(m.decrypted_psnr, f64::INFINITY);
        assert_eq!(m.encrypted_psnr, psnr(&original, &encrypted).unwrap());
        assert_eq!(m.distribution, distribution(&encrypted));
    }
}
