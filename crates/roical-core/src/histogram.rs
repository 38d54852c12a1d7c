//! Residual distributions: uniformly binned histograms with flow accounting
//! and an unbinned moment summary.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Binning configuration for a residual distribution.
///
/// The downstream comparison plots rely on fixed, documented ranges, so this
/// is configuration rather than a hard constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionBinning {
    /// Number of uniform bins.
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub lo: f64,
    /// Upper edge of the last bin.
    pub hi: f64,
}

impl ResolutionBinning {
    /// Create a binning, validating `n_bins > 0` and `lo < hi`.
    pub fn new(n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Validation("n_bins must be > 0".to_string()));
        }
        if !(lo < hi) {
            return Err(Error::Validation(format!("invalid range: lo={lo}, hi={hi}")));
        }
        Ok(Self { n_bins, lo, hi })
    }

    /// Bin width.
    pub fn width(&self) -> f64 {
        (self.hi - self.lo) / self.n_bins as f64
    }
}

impl Default for ResolutionBinning {
    /// 50 bins over `[-0.1, 0.1]`, the default for both energy and mass
    /// residual distributions.
    fn default() -> Self {
        Self { n_bins: 50, lo: -0.1, hi: 0.1 }
    }
}

/// A filled residual distribution.
///
/// Entries outside the range are recorded as under/overflow, not folded.
/// The moment summary (`mean`, `std_dev`) is accumulated from the unbinned
/// values, including the ones outside the histogram range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionHistogram {
    /// Binning in effect.
    pub binning: ResolutionBinning,
    /// Bin contents (length `n_bins`).
    pub bin_content: Vec<f64>,
    /// Entries below the range.
    pub underflow: f64,
    /// Entries at or above the upper edge.
    pub overflow: f64,
    /// Total entries filled.
    pub entries: u64,
    sum: f64,
    sum_sq: f64,
}

impl ResolutionHistogram {
    /// Create an empty histogram.
    pub fn new(binning: ResolutionBinning) -> Self {
        Self {
            binning,
            bin_content: vec![0.0; binning.n_bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Fill one value.
    pub fn fill(&mut self, value: f64) {
        self.entries += 1;
        self.sum += value;
        self.sum_sq += value * value;

        if value < self.binning.lo {
            self.underflow += 1.0;
        } else if value >= self.binning.hi {
            self.overflow += 1.0;
        } else {
            let bin = ((value - self.binning.lo) / self.binning.width()) as usize;
            // Guard against value == hi - epsilon rounding up.
            let bin = bin.min(self.binning.n_bins - 1);
            self.bin_content[bin] += 1.0;
        }
    }

    /// Bin edges (length `n_bins + 1`).
    pub fn bin_edges(&self) -> Vec<f64> {
        (0..=self.binning.n_bins)
            .map(|i| self.binning.lo + i as f64 * self.binning.width())
            .collect()
    }

    /// Mean of all filled values. `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.entries == 0 {
            return None;
        }
        Some(self.sum / self.entries as f64)
    }

    /// Sample standard deviation of all filled values. `None` below 2 entries.
    pub fn std_dev(&self) -> Option<f64> {
        if self.entries < 2 {
            return None;
        }
        let n = self.entries as f64;
        let mean = self.sum / n;
        let var = (self.sum_sq - n * mean * mean) / (n - 1.0);
        Some(var.max(0.0).sqrt())
    }

    /// Bin contents normalized to unit integral (in-range entries only).
    /// Empty histograms normalize to all zeros.
    pub fn normalized(&self) -> Vec<f64> {
        let integral: f64 = self.bin_content.iter().sum();
        if integral <= 0.0 {
            return vec![0.0; self.binning.n_bins];
        }
        self.bin_content.iter().map(|&c| c / integral).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binning_matches_comparison_plots() {
        let b = ResolutionBinning::default();
        assert_eq!(b.n_bins, 50);
        assert_eq!(b.lo, -0.1);
        assert_eq!(b.hi, 0.1);
    }

    #[test]
    fn invalid_binning_rejected() {
        assert!(ResolutionBinning::new(0, -1.0, 1.0).is_err());
        assert!(ResolutionBinning::new(10, 1.0, 1.0).is_err());
    }

    #[test]
    fn fill_and_flows() {
        let mut h = ResolutionHistogram::new(ResolutionBinning::new(4, 0.0, 4.0).unwrap());
        for v in [-0.5, 0.5, 1.5, 1.6, 4.0, 7.0] {
            h.fill(v);
        }
        assert_eq!(h.bin_content, vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(h.underflow, 1.0);
        assert_eq!(h.overflow, 2.0);
        assert_eq!(h.entries, 6);
    }

    #[test]
    fn moment_summary() {
        let mut h = ResolutionHistogram::new(ResolutionBinning::default());
        for v in [0.01, 0.03, 0.05] {
            h.fill(v);
        }
        assert!((h.mean().unwrap() - 0.03).abs() < 1e-12);
        assert!((h.std_dev().unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn normalized_sums_to_one() {
        let mut h = ResolutionHistogram::new(ResolutionBinning::default());
        for v in [0.0, 0.0, 0.05, -0.05] {
            h.fill(v);
        }
        let total: f64 = h.normalized().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
