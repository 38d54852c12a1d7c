//! Massless four-vector kinematics for the paired-object mass.

use std::ops::Add;

/// A massless four-vector built from `(pt, eta, phi)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourVector {
    px: f64,
    py: f64,
    pz: f64,
    e: f64,
}

impl FourVector {
    /// Build from transverse momentum, pseudorapidity and azimuth (mass 0).
    pub fn from_pt_eta_phi(pt: f64, eta: f64, phi: f64) -> Self {
        Self { px: pt * phi.cos(), py: pt * phi.sin(), pz: pt * eta.sinh(), e: pt * eta.cosh() }
    }

    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        (self.px * self.px + self.py * self.py).sqrt()
    }

    /// Energy.
    pub fn energy(&self) -> f64 {
        self.e
    }

    /// Invariant mass; clamped at zero against rounding.
    pub fn mass(&self) -> f64 {
        let p2 = self.px * self.px + self.py * self.py + self.pz * self.pz;
        (self.e * self.e - p2).max(0.0).sqrt()
    }
}

impl Add for FourVector {
    type Output = FourVector;

    fn add(self, rhs: FourVector) -> FourVector {
        FourVector {
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
            e: self.e + rhs.e,
        }
    }
}
