//! Signal regions and the reference-region noise rescaling.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the nested signal-collection cones of increasing radius around
/// a reconstructed object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SignalRegion {
    /// Innermost cone, radius 1.3.
    Sr1,
    /// Intermediate cone, radius 2.6.
    Sr2,
    /// Outermost cone, radius 5.3; also the noise reference.
    Sr3,
}

impl SignalRegion {
    /// All regions, in index order.
    pub const ALL: [SignalRegion; 3] = [SignalRegion::Sr1, SignalRegion::Sr2, SignalRegion::Sr3];

    /// Region whose measured noise is rescaled to the others.
    pub const NOISE_REFERENCE: SignalRegion = SignalRegion::Sr3;

    /// 1-based region index as used in input column names (`en1_2`, ...).
    pub fn index(self) -> usize {
        match self {
            SignalRegion::Sr1 => 1,
            SignalRegion::Sr2 => 2,
            SignalRegion::Sr3 => 3,
        }
    }

    /// Cone radius.
    pub fn radius(self) -> f64 {
        match self {
            SignalRegion::Sr1 => 1.3,
            SignalRegion::Sr2 => 2.6,
            SignalRegion::Sr3 => 5.3,
        }
    }

    /// Geometric cone area.
    pub fn area(self) -> f64 {
        let r = self.radius();
        PI * r * r
    }

    /// Noise estimate for this region from the reference-region measurement.
    ///
    /// Per-region noise accounting upstream is unreliable, so noise is always
    /// measured at the reference cone and rescaled by the area ratio. This
    /// rescaling is part of the calibration numerics and must not be swapped
    /// for a per-region measurement.
    pub fn rescale_noise(self, reference_noise: f64) -> f64 {
        reference_noise * self.area() / Self::NOISE_REFERENCE.area()
    }
}

impl fmt::Display for SignalRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SR{}", self.index())
    }
}
