//! # roical-core
//!
//! Shared types for the ROI energy-calibration toolkit: signal regions,
//! fitted calibration functions, the ordered L0/L1/L2 calibration chain,
//! residual histograms, and the common error type.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod function;
pub mod histogram;
pub mod region;

pub use error::{Error, Result};
pub use function::{
    CalibrationBuilder, CalibrationFunction, CalibrationSet, RegionFunctions, Stage, WithL0,
    WithL1, WithL2,
};
pub use histogram::{ResolutionBinning, ResolutionHistogram};
pub use region::SignalRegion;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
