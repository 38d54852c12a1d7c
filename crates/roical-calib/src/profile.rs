//! Median profiles of a response variable over fixed bin edges.
//!
//! The median, not the mean, is used per bin so that outlier tails in the
//! response do not pull the profile.

use crate::binning::quantile_sorted;

/// One populated profile bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    /// Center of the bin over the binning variable.
    pub bin_center: f64,
    /// Median of the response values in the bin.
    pub median: f64,
    /// Robust spread: half of the central 68% interval of the responses.
    pub spread: f64,
}

/// Profile construction settings.
#[derive(Debug, Clone, Copy)]
pub struct ProfileConfig {
    /// Response values outside this window are dropped before aggregation,
    /// mirroring the finite response axis the scatter is accumulated on.
    pub response_window: (f64, f64),
}

impl ProfileConfig {
    /// Window for relative residuals (`rec/gen - 1`).
    pub const RELATIVE: ProfileConfig = ProfileConfig { response_window: (-1.0, 1.0) };

    /// Window for absolute residuals in GeV (`rec - gen`).
    pub const ABSOLUTE: ProfileConfig = ProfileConfig { response_window: (-100.0, 100.0) };
}

/// Build the median profile of `(x, response)` pairs over `edges`.
///
/// Bins with no entries are omitted, not zero-filled. Edges are assumed
/// sorted (as produced by [`crate::binning::quantile_edges`]); values at or
/// beyond the last edge fall outside the profile.
pub fn median_profile(
    pairs: &[(f64, f64)],
    edges: &[f64],
    config: ProfileConfig,
) -> Vec<ProfilePoint> {
    let n_bins = edges.len().saturating_sub(1);
    let (win_lo, win_hi) = config.response_window;

    let mut bins: Vec<Vec<f64>> = vec![Vec::new(); n_bins];
    for &(x, response) in pairs {
        if response < win_lo || response > win_hi {
            continue;
        }
        if let Some(bin) = find_bin(edges, x) {
            bins[bin].push(response);
        }
    }

    bins.into_iter()
        .enumerate()
        .filter(|(_, values)| !values.is_empty())
        .map(|(bin, mut values)| {
            values.sort_by(f64::total_cmp);
            let median = quantile_sorted(&values, 0.5);
            let spread = 0.5 * (quantile_sorted(&values, 0.84) - quantile_sorted(&values, 0.16));
            ProfilePoint { bin_center: 0.5 * (edges[bin] + edges[bin + 1]), median, spread }
        })
        .collect()
}

/// Find the bin index for a value given sorted bin edges.
///
/// Returns `None` for underflow/overflow.
pub(crate) fn find_bin(edges: &[f64], val: f64) -> Option<usize> {
    if val < edges[0] || val >= edges[edges.len() - 1] {
        return None;
    }
    match edges.binary_search_by(|e| e.partial_cmp(&val).unwrap()) {
        Ok(i) => {
            if i >= edges.len() - 1 {
                None
            } else {
                Some(i)
            }
        }
        Err(i) => {
            if i == 0 || i >= edges.len() {
                None
            } else {
                Some(i - 1)
            }
        }
    }
}
