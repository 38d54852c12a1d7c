//! # roical-calib
//!
//! ROI energy-calibration pipeline: sample extraction under physics cuts,
//! adaptive quantile binning, median-profile polynomial fits, the staged
//! L0/L1/L2 derivation, and resolution evaluation of a derived chain.
//!
//! ## Example
//!
//! ```no_run
//! use roical_calib::{CalibrationApplier, CalibrationPipeline, EventTable};
//!
//! let no_pu = EventTable::from_json_file("nopu.json").unwrap();
//! let pipeline = CalibrationPipeline::new();
//! let (set, report) = pipeline.derive_l0_l1(&no_pu);
//! println!("fitted {} (region, stage) pairs", report.fitted.len());
//!
//! let dists = CalibrationApplier::new(&set).evaluate(&no_pu);
//! for (region, res) in &dists.regions {
//!     println!("{region}: sigma(dE/E) = {:?}", res.energy.std_dev());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod binning;
pub mod extract;
pub mod kinematics;
pub mod pipeline;
pub mod polyfit;
pub mod profile;
pub mod table;

pub use apply::{CalibrationApplier, PairSelection, RegionResolution, ResolutionDistributions};
pub use binning::quantile_edges;
pub use extract::{CalibrationSample, SampleExtractor, GEN_ETA_WINDOW, MIN_GEN_ENERGY};
pub use kinematics::FourVector;
pub use pipeline::{CalibrationPipeline, DerivationReport, PipelineConfig};
pub use polyfit::fit_polynomial;
pub use profile::{median_profile, ProfileConfig, ProfilePoint};
pub use table::{EventTable, ObjectIndex};
