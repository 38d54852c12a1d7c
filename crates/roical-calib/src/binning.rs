//! Adaptive quantile binning of an empirical distribution.

use roical_core::{Error, Result};

/// Quantile for sorted data via linear interpolation.
///
/// - `q=0` returns min
/// - `q=1` returns max
/// - empty input returns `NaN`
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    let j = pos.ceil() as usize;
    if i == j {
        return sorted[i];
    }
    let t = pos - i as f64;
    (1.0 - t) * sorted[i] + t * sorted[j]
}

/// Compute `nq + 1` bin edges at the `i*100/nq` percentiles of `values`.
///
/// Edges are non-decreasing by construction and cover the observed range
/// (first edge = min, last edge = max). Degenerate inputs (identical values,
/// or fewer distinct values than bins) produce coinciding candidate edges;
/// the policy is deterministic: exactly-equal adjacent edges are merged,
/// yielding fewer, wider bins, and the collapse is logged. If fewer than two
/// distinct edges remain the distribution cannot be binned at all and
/// `BinningDegenerate` is returned.
pub fn quantile_edges(values: &[f64], nq: usize) -> Result<Vec<f64>> {
    if nq == 0 {
        return Err(Error::Validation("bin count must be > 0".to_string()));
    }
    if values.is_empty() {
        return Err(Error::BinningDegenerate("no values to bin".to_string()));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut edges: Vec<f64> =
        (0..=nq).map(|i| quantile_sorted(&sorted, i as f64 / nq as f64)).collect();
    edges.dedup();

    if edges.len() < 2 {
        return Err(Error::BinningDegenerate(format!(
            "all {} candidate edges coincide at {}",
            nq + 1,
            edges[0]
        )));
    }
    if edges.len() < nq + 1 {
        tracing::warn!(
            requested = nq,
            effective = edges.len() - 1,
            "quantile edges collapsed, continuing with wider bins"
        );
    }

    Ok(edges)
}
