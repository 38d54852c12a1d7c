//! End-to-end derivation and evaluation on synthetic datasets.

use std::collections::HashMap;

use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use roical_calib::{CalibrationApplier, CalibrationPipeline, EventTable};
use roical_core::{CalibrationSet, SignalRegion, Stage};

struct GenObject {
    energy: f64,
    eta: f64,
    phi: f64,
}

/// Build a table where each region's reconstructed energy is
/// `gen * (1 + bias(eta)) + offset(ref_noise, region)` plus gaussian smearing.
fn synthetic_table(
    rng: &mut StdRng,
    n_events: usize,
    bias: impl Fn(f64) -> f64,
    ref_noise: impl Fn(&mut StdRng) -> f64,
    offset: impl Fn(f64, SignalRegion) -> f64,
    smear_frac: f64,
) -> EventTable {
    let eta_dist = Uniform::new(1.6, 2.6).unwrap();
    let phi_dist = Uniform::new(-std::f64::consts::PI, std::f64::consts::PI).unwrap();
    let lead_dist = Uniform::new(300.0, 400.0).unwrap();
    let sub_dist = Uniform::new(200.0, 400.0).unwrap();

    let mut cols: HashMap<String, Vec<f64>> = HashMap::new();
    let names = |tag: usize| {
        (
            format!("genen{tag}"),
            format!("geneta{tag}"),
            format!("genphi{tag}"),
            format!("noise{tag}_3"),
        )
    };
    for tag in 1..=2 {
        let (en, eta, phi, noise) = names(tag);
        cols.insert(en, Vec::new());
        cols.insert(eta, Vec::new());
        cols.insert(phi, Vec::new());
        cols.insert(noise, Vec::new());
        for r in 1..=3 {
            cols.insert(format!("en{tag}_{r}"), Vec::new());
        }
    }

    for _ in 0..n_events {
        let objects = [
            GenObject {
                energy: lead_dist.sample(rng),
                eta: eta_dist.sample(rng),
                phi: phi_dist.sample(rng),
            },
            GenObject {
                energy: sub_dist.sample(rng),
                eta: -eta_dist.sample(rng),
                phi: phi_dist.sample(rng),
            },
        ];
        for (tag, obj) in objects.iter().enumerate().map(|(i, o)| (i + 1, o)) {
            let (en, eta, phi, noise) = names(tag);
            let nref = ref_noise(rng);
            cols.get_mut(&en).unwrap().push(obj.energy);
            cols.get_mut(&eta).unwrap().push(obj.eta);
            cols.get_mut(&phi).unwrap().push(obj.phi);
            cols.get_mut(&noise).unwrap().push(nref);
            for (r, region) in SignalRegion::ALL.into_iter().enumerate().map(|(i, x)| (i + 1, x)) {
                let smear = if smear_frac > 0.0 {
                    Normal::new(0.0, smear_frac * obj.energy).unwrap().sample(rng)
                } else {
                    0.0
                };
                let rec = obj.energy * (1.0 + bias(obj.eta.abs()))
                    + offset(nref, region)
                    + smear;
                cols.get_mut(&format!("en{tag}_{r}")).unwrap().push(rec);
            }
        }
    }

    EventTable::from_columns(cols).unwrap()
}

#[test]
fn l0_narrows_the_energy_resolution() {
    let mut rng = StdRng::seed_from_u64(7);
    let table = synthetic_table(
        &mut rng,
        2000,
        |eta| 0.1 * (eta - 1.6),
        |_| 0.0,
        |_, _| 0.0,
        0.0,
    );

    let pipeline = CalibrationPipeline::new();
    let (set, report) = pipeline.derive_l0_l1(&table);
    assert!(report.skipped.is_empty(), "skipped: {:?}", report.skipped);

    let raw = CalibrationApplier::new(&CalibrationSet::empty()).evaluate(&table);
    let calibrated = CalibrationApplier::new(&set).evaluate(&table);

    for region in SignalRegion::ALL {
        let before = raw.regions[&region].energy.std_dev().unwrap();
        let after = calibrated.regions[&region].energy.std_dev().unwrap();
        assert!(
            after < before,
            "{region}: sigma(dE/E) {after} not below uncalibrated {before}"
        );
    }
}

#[test]
fn fitted_eta_response_tracks_the_true_bias_under_noise() {
    let mut rng = StdRng::seed_from_u64(11);
    let table = synthetic_table(
        &mut rng,
        4000,
        |eta| 0.08 * (eta - 1.6) - 0.02,
        |_| 0.0,
        |_, _| 0.0,
        0.02, // symmetric 2% smearing
    );

    let (set, _) = CalibrationPipeline::new().derive_l0_l1(&table);
    let l0 = set.function(Stage::L0, SignalRegion::Sr1).unwrap();
    for eta in [1.7, 2.0, 2.3, 2.5] {
        let truth = 0.08 * (eta - 1.6) - 0.02;
        assert!(
            (l0.eval(eta) - truth).abs() < 0.01,
            "eta={eta}: fitted {} vs true {truth}",
            l0.eval(eta)
        );
    }
}

#[test]
fn full_chain_on_a_pileup_dataset() {
    let mut rng = StdRng::seed_from_u64(23);

    // Clean dataset for L0/L1.
    let clean = synthetic_table(
        &mut rng,
        2000,
        |eta| 0.05 * (eta - 1.6),
        |_| 0.0,
        |_, _| 0.0,
        0.0,
    );
    // Pileup dataset: same response bias plus an additive offset that grows
    // with the rescaled reference noise.
    let noisy = synthetic_table(
        &mut rng,
        2000,
        |eta| 0.05 * (eta - 1.6),
        |rng| rng.random_range(20.0..60.0),
        |nref, region| 1.5 * region.rescale_noise(nref),
        0.0,
    );

    let pipeline = CalibrationPipeline::new();
    let (l0l1, _) = pipeline.derive_l0_l1(&clean);
    let (full, report) = pipeline.derive_noise(&noisy, &l0l1).unwrap();
    assert_eq!(full.label(), "L0L1L2");
    assert!(
        report.skipped.is_empty(),
        "noise stage skipped regions: {:?}",
        report.skipped
    );

    let without_l2 = CalibrationApplier::new(&l0l1).evaluate(&noisy);
    let with_l2 = CalibrationApplier::new(&full).evaluate(&noisy);

    for region in SignalRegion::ALL {
        let before = without_l2.regions[&region].energy.mean().unwrap();
        let after = with_l2.regions[&region].energy.mean().unwrap();
        assert!(
            after.abs() < before.abs(),
            "{region}: |mean dE/E| {after} not below {before}"
        );
        assert!(after.abs() < 0.02, "{region}: residual bias {after} too large");
    }
}
