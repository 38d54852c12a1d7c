//! Staged derivation of the calibration chain.
//!
//! Three ordered stages per signal region:
//!
//! 1. **L0** eta response: relative residual vs generated |eta|, degree 2.
//! 2. **L1** absolute scale: relative residual, after L0, vs the
//!    L0-corrected energy, degree 1.
//! 3. **L2** noise offset: absolute residual (GeV), after L0 and L1, vs
//!    the rescaled noise estimate, degree 2. Derived from a separate,
//!    higher-background dataset.
//!
//! A stage is always fit on the residuals left by the stages before it;
//! the `CalibrationSet` builder enforces that ordering at the type level.
//! Failures are scoped: one region's degenerate binning or singular fit is
//! recorded in the [`DerivationReport`] and the other regions proceed.

use roical_core::{
    CalibrationFunction, CalibrationSet, Error, RegionFunctions, Result, SignalRegion, Stage,
};

use crate::binning::quantile_edges;
use crate::extract::{CalibrationSample, SampleExtractor};
use crate::polyfit::fit_polynomial;
use crate::profile::{median_profile, ProfileConfig, ProfilePoint};
use crate::table::EventTable;

/// Spread floor when weighting profile points, for bins whose responses
/// all coincide.
const MIN_SPREAD: f64 = 1e-6;

/// Settings for one derivation pass.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Quantile bins over |eta| for L0.
    pub eta_bins: usize,
    /// Quantile bins over the L0-corrected energy for L1.
    pub energy_bins: usize,
    /// Quantile bins over the rescaled noise for L2.
    pub noise_bins: usize,
    /// Sample selection cuts.
    pub extractor: SampleExtractor,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { eta_bins: 6, energy_bins: 6, noise_bins: 10, extractor: SampleExtractor::new() }
    }
}

/// Per-(region, stage) derivation outcomes.
#[derive(Debug, Clone, Default)]
pub struct DerivationReport {
    /// Regions and stages that produced a function.
    pub fitted: Vec<(SignalRegion, Stage)>,
    /// Regions and stages skipped, with the reason.
    pub skipped: Vec<(SignalRegion, Stage, String)>,
}

impl DerivationReport {
    fn fit_ok(&mut self, region: SignalRegion, stage: Stage) {
        self.fitted.push((region, stage));
    }

    fn skip(&mut self, region: SignalRegion, stage: Stage, err: &Error) {
        tracing::warn!(region = %region, stage = %stage, error = %err, "stage skipped");
        self.skipped.push((region, stage, err.to_string()));
    }

    /// Merge another report into this one.
    pub fn extend(&mut self, other: DerivationReport) {
        self.fitted.extend(other.fitted);
        self.skipped.extend(other.skipped);
    }
}

/// Orchestrates the ordered derivation stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationPipeline {
    config: PipelineConfig,
}

impl CalibrationPipeline {
    /// Pipeline with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline with explicit settings.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Derive L0 and L1 from a zero-background dataset.
    ///
    /// For each region the L0 fit must exist before its L1 residuals can be
    /// computed; a region whose L0 fails therefore has no L1 either.
    pub fn derive_l0_l1(&self, table: &EventTable) -> (CalibrationSet, DerivationReport) {
        let mut l0 = RegionFunctions::new();
        let mut l1 = RegionFunctions::new();
        let mut report = DerivationReport::default();

        for region in SignalRegion::ALL {
            let samples = self.config.extractor.extract(table, region);

            let l0_fn = match self.fit_eta_response(&samples) {
                Ok(f) => f,
                Err(e) => {
                    report.skip(region, Stage::L0, &e);
                    report.skip(
                        region,
                        Stage::L1,
                        &Error::Validation("no L0 function to build residuals from".to_string()),
                    );
                    continue;
                }
            };
            report.fit_ok(region, Stage::L0);

            match self.fit_absolute_scale(&samples, &l0_fn) {
                Ok(f) => {
                    report.fit_ok(region, Stage::L1);
                    l1.insert(region, f);
                }
                Err(e) => report.skip(region, Stage::L1, &e),
            }
            l0.insert(region, l0_fn);
        }

        (CalibrationSet::builder().l0(l0).l1(l1).build(), report)
    }

    /// Derive L2 from a separate, higher-background dataset.
    ///
    /// The input set must already carry L0 and L1; those corrections are
    /// applied to the new dataset before its absolute residual is fit
    /// against the rescaled noise estimate. Returns a new set extending the
    /// input chain.
    pub fn derive_noise(
        &self,
        table: &EventTable,
        set: &CalibrationSet,
    ) -> Result<(CalibrationSet, DerivationReport)> {
        let (l0, l1) = match (set.l0(), set.l1()) {
            (Some(l0), Some(l1)) => (l0, l1),
            _ => {
                return Err(Error::Validation(
                    "noise-stage derivation requires an L0+L1 calibration".to_string(),
                ));
            }
        };

        let mut l2 = RegionFunctions::new();
        let mut report = DerivationReport::default();

        for region in SignalRegion::ALL {
            let (Some(l0_fn), Some(l1_fn)) = (l0.get(&region), l1.get(&region)) else {
                report.skip(
                    region,
                    Stage::L2,
                    &Error::Validation("region has no L0/L1 functions".to_string()),
                );
                continue;
            };

            let samples = self.config.extractor.extract(table, region);
            match self.fit_noise_offset(&samples, l0_fn, l1_fn) {
                Ok(f) => {
                    report.fit_ok(region, Stage::L2);
                    l2.insert(region, f);
                }
                Err(e) => report.skip(region, Stage::L2, &e),
            }
        }

        let extended =
            CalibrationSet::builder().l0(l0.clone()).l1(l1.clone()).l2(l2).build();
        Ok((extended, report))
    }

    /// L0: relative residual of the raw energy vs |eta|, degree 2.
    fn fit_eta_response(&self, samples: &[CalibrationSample]) -> Result<CalibrationFunction> {
        let etas: Vec<f64> = samples.iter().map(|s| s.gen_eta).collect();
        let edges = quantile_edges(&etas, self.config.eta_bins)?;

        let pairs: Vec<(f64, f64)> = samples
            .iter()
            .map(|s| (s.gen_eta, s.rec_energy / s.gen_energy - 1.0))
            .collect();
        let points = median_profile(&pairs, &edges, ProfileConfig::RELATIVE);
        fit_profile(&points, 2, (edges[0], edges[edges.len() - 1]))
    }

    /// L1: relative residual after L0 vs the L0-corrected energy, degree 1.
    fn fit_absolute_scale(
        &self,
        samples: &[CalibrationSample],
        l0: &CalibrationFunction,
    ) -> Result<CalibrationFunction> {
        let pairs: Vec<(f64, f64)> = samples
            .iter()
            .map(|s| {
                let corrected = s.rec_energy / (1.0 + l0.eval(s.gen_eta));
                (corrected, corrected / s.gen_energy - 1.0)
            })
            .collect();

        let energies: Vec<f64> = pairs.iter().map(|&(e, _)| e).collect();
        let edges = quantile_edges(&energies, self.config.energy_bins)?;

        let points = median_profile(&pairs, &edges, ProfileConfig::RELATIVE);
        fit_profile(&points, 1, (edges[0], edges[edges.len() - 1]))
    }

    /// L2: absolute residual after L0 and L1 vs the rescaled noise, degree 2.
    fn fit_noise_offset(
        &self,
        samples: &[CalibrationSample],
        l0: &CalibrationFunction,
        l1: &CalibrationFunction,
    ) -> Result<CalibrationFunction> {
        let pairs: Vec<(f64, f64)> = samples
            .iter()
            .map(|s| {
                let mut e = s.rec_energy / (1.0 + l0.eval(s.gen_eta));
                e /= 1.0 + l1.eval(e);
                (s.avg_noise, e - s.gen_energy)
            })
            .collect();

        let noises: Vec<f64> = pairs.iter().map(|&(n, _)| n).collect();
        let edges = quantile_edges(&noises, self.config.noise_bins)?;

        let points = median_profile(&pairs, &edges, ProfileConfig::ABSOLUTE);
        fit_profile(&points, 2, (edges[0], edges[edges.len() - 1]))
    }
}

/// Fit a polynomial through profile points, weighted by `1/spread^2`.
fn fit_profile(
    points: &[ProfilePoint],
    degree: usize,
    domain: (f64, f64),
) -> Result<CalibrationFunction> {
    let xs: Vec<f64> = points.iter().map(|p| p.bin_center).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.median).collect();
    let ws: Vec<f64> = points
        .iter()
        .map(|p| {
            let s = p.spread.max(MIN_SPREAD);
            1.0 / (s * s)
        })
        .collect();

    let coefficients = fit_polynomial(&xs, &ys, &ws, degree)?;
    Ok(CalibrationFunction::new(coefficients, domain))
}
