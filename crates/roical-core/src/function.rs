//! Fitted calibration functions and the ordered calibration chain.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::region::SignalRegion;

/// Calibration stage, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Eta-response equalization (relative residual vs |eta|).
    L0,
    /// Absolute energy scale (relative residual vs corrected energy).
    L1,
    /// Noise/pileup offset (absolute residual vs rescaled noise).
    L2,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::L0 => write!(f, "L0"),
            Stage::L1 => write!(f, "L1"),
            Stage::L2 => write!(f, "L2"),
        }
    }
}

/// A fitted polynomial correction.
///
/// Coefficients are stored in ascending power order. The domain records the
/// binning range of the fit; evaluation outside it extrapolates and is
/// permitted but not guaranteed meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFunction {
    /// Polynomial degree.
    pub degree: usize,
    /// Coefficients, ascending power order (length `degree + 1`).
    pub coefficients: Vec<f64>,
    /// Binning range of the fit `[lo, hi]`.
    pub domain: (f64, f64),
}

impl CalibrationFunction {
    /// Create from ascending-order coefficients and the fitted range.
    pub fn new(coefficients: Vec<f64>, domain: (f64, f64)) -> Self {
        let degree = coefficients.len().saturating_sub(1);
        Self { degree, coefficients, domain }
    }

    /// Evaluate via Horner's rule.
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }
}

/// Per-region calibration functions for one stage. Regions whose fit failed
/// are simply absent.
pub type RegionFunctions = BTreeMap<SignalRegion, CalibrationFunction>;

/// Ordered chain of per-region corrections.
///
/// Stages are applied `L0 -> L1 -> L2`; each stage is applied only if present,
/// and a later stage is only ever applied on top of the earlier ones. The set
/// is immutable once built; construction goes through [`CalibrationBuilder`],
/// which makes out-of-order assembly impossible at the type level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationSet {
    l0: Option<RegionFunctions>,
    l1: Option<RegionFunctions>,
    l2: Option<RegionFunctions>,
}

impl CalibrationSet {
    /// A set with no stages: application is the identity.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a chain (L0 first).
    pub fn builder() -> CalibrationBuilder {
        CalibrationBuilder
    }

    /// L0 functions, if the stage is present.
    pub fn l0(&self) -> Option<&RegionFunctions> {
        self.l0.as_ref()
    }

    /// L1 functions, if the stage is present.
    pub fn l1(&self) -> Option<&RegionFunctions> {
        self.l1.as_ref()
    }

    /// L2 functions, if the stage is present.
    pub fn l2(&self) -> Option<&RegionFunctions> {
        self.l2.as_ref()
    }

    /// Function for one stage and region, if fitted.
    pub fn function(&self, stage: Stage, region: SignalRegion) -> Option<&CalibrationFunction> {
        let stage_map = match stage {
            Stage::L0 => self.l0.as_ref(),
            Stage::L1 => self.l1.as_ref(),
            Stage::L2 => self.l2.as_ref(),
        };
        stage_map.and_then(|m| m.get(&region))
    }

    /// Stages present in the set, in application order.
    pub fn stages(&self) -> Vec<Stage> {
        let mut out = Vec::new();
        if self.l0.is_some() {
            out.push(Stage::L0);
        }
        if self.l1.is_some() {
            out.push(Stage::L1);
        }
        if self.l2.is_some() {
            out.push(Stage::L2);
        }
        out
    }

    /// Concatenated stage label, e.g. `"L0L1"`, used to tag artifacts.
    pub fn label(&self) -> String {
        self.stages().iter().map(Stage::to_string).collect()
    }
}

/// Entry point of the typestate builder: only `l0` is available.
pub struct CalibrationBuilder;

impl CalibrationBuilder {
    /// Commit the L0 stage.
    pub fn l0(self, functions: RegionFunctions) -> WithL0 {
        WithL0 { l0: functions }
    }
}

/// Builder state after L0 has been committed.
pub struct WithL0 {
    l0: RegionFunctions,
}

impl WithL0 {
    /// Commit the L1 stage on top of L0.
    pub fn l1(self, functions: RegionFunctions) -> WithL1 {
        WithL1 { l0: self.l0, l1: functions }
    }

    /// Finish with L0 only.
    pub fn build(self) -> CalibrationSet {
        CalibrationSet { l0: Some(self.l0), l1: None, l2: None }
    }
}

/// Builder state after L0 and L1 have been committed.
pub struct WithL1 {
    l0: RegionFunctions,
    l1: RegionFunctions,
}

impl WithL1 {
    /// Commit the L2 stage on top of L0 and L1.
    pub fn l2(self, functions: RegionFunctions) -> WithL2 {
        WithL2 { l0: self.l0, l1: self.l1, l2: functions }
    }

    /// Finish with L0 and L1.
    pub fn build(self) -> CalibrationSet {
        CalibrationSet { l0: Some(self.l0), l1: Some(self.l1), l2: None }
    }
}

/// Builder state with the full chain committed.
pub struct WithL2 {
    l0: RegionFunctions,
    l1: RegionFunctions,
    l2: RegionFunctions,
}

impl WithL2 {
    /// Finish with the full chain.
    pub fn build(self) -> CalibrationSet {
        CalibrationSet { l0: Some(self.l0), l1: Some(self.l1), l2: Some(self.l2) }
    }
}
