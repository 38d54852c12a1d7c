//! ROI calibration CLI

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use roical_calib::{CalibrationApplier, CalibrationPipeline, EventTable, ResolutionDistributions};
use roical_core::CalibrationSet;

#[derive(Parser)]
#[command(name = "roical")]
#[command(about = "ROI energy calibration - staged derivation and resolution evaluation")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the calibration chain and evaluate resolutions
    Calibrate {
        /// Zero-background dataset (JSON column map), used for L0/L1
        #[arg(long)]
        no_pu: PathBuf,

        /// Higher-background dataset used for the L2 noise stage
        #[arg(long)]
        pu: Option<PathBuf>,

        /// Label for the higher-background scenario (e.g. "PU140")
        #[arg(long, default_value = "pu")]
        pu_tag: String,

        /// Extra evaluation-only scenarios, comma-separated `label:path` pairs,
        /// run through the finalized chain
        #[arg(long)]
        extra: Option<String>,

        /// Output directory for JSON artifacts. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a persisted calibration to a dataset without re-deriving
    Apply {
        /// Calibration JSON produced by `calibrate`
        #[arg(long)]
        calibration: PathBuf,

        /// Dataset to evaluate (JSON column map)
        #[arg(short, long)]
        input: PathBuf,

        /// Label used in the output artifact
        #[arg(long, default_value = "scenario")]
        label: String,

        /// Output directory for JSON artifacts. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Calibrate { no_pu, pu, pu_tag, extra, output } => {
            cmd_calibrate(&no_pu, pu.as_deref(), &pu_tag, extra.as_deref(), output.as_deref())
        }
        Commands::Apply { calibration, input, label, output } => {
            cmd_apply(&calibration, &input, &label, output.as_deref())
        }
        Commands::Version => {
            println!("roical {}", roical_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_calibrate(
    no_pu: &Path,
    pu: Option<&Path>,
    pu_tag: &str,
    extra: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let pipeline = CalibrationPipeline::new();

    tracing::info!(path = %no_pu.display(), "loading zero-background dataset");
    let clean = EventTable::from_json_file(no_pu)
        .with_context(|| format!("loading {}", no_pu.display()))?;

    let (set, report) = pipeline.derive_l0_l1(&clean);
    tracing::info!(
        fitted = report.fitted.len(),
        skipped = report.skipped.len(),
        "L0/L1 derivation complete"
    );

    let mut artifacts: Vec<(String, serde_json::Value)> = Vec::new();
    artifacts.push(resolution_artifact("nopu", CalibrationApplier::new(&set).evaluate(&clean)));

    let set = match pu {
        Some(pu_path) => {
            tracing::info!(path = %pu_path.display(), tag = pu_tag, "loading background dataset");
            let noisy = EventTable::from_json_file(pu_path)
                .with_context(|| format!("loading {}", pu_path.display()))?;

            let (set, noise_report) = pipeline.derive_noise(&noisy, &set)?;
            tracing::info!(
                fitted = noise_report.fitted.len(),
                skipped = noise_report.skipped.len(),
                "noise-stage derivation complete"
            );

            artifacts
                .push(resolution_artifact(pu_tag, CalibrationApplier::new(&set).evaluate(&noisy)));
            set
        }
        None => set,
    };

    // Evaluation-only scenarios run through the finalized chain.
    for (label, path) in parse_scenarios(extra)? {
        tracing::info!(path = %path.display(), label = %label, "evaluating extra scenario");
        let table = EventTable::from_json_file(&path)
            .with_context(|| format!("loading {}", path.display()))?;
        artifacts.push(resolution_artifact(&label, CalibrationApplier::new(&set).evaluate(&table)));
    }

    emit(output, "calibration.json", &serde_json::to_value(&set)?)?;
    for (name, value) in &artifacts {
        emit(output, name, value)?;
    }
    Ok(())
}

fn cmd_apply(calibration: &Path, input: &Path, label: &str, output: Option<&Path>) -> Result<()> {
    let bytes = fs::read(calibration)
        .with_context(|| format!("reading {}", calibration.display()))?;
    let set: CalibrationSet = serde_json::from_slice(&bytes)?;
    tracing::info!(stages = %set.label(), "calibration loaded");

    let table = EventTable::from_json_file(input)
        .with_context(|| format!("loading {}", input.display()))?;
    let (name, value) = resolution_artifact(label, CalibrationApplier::new(&set).evaluate(&table));
    emit(output, &name, &value)
}

/// Parse `label:path,label:path` scenario lists.
fn parse_scenarios(extra: Option<&str>) -> Result<Vec<(String, PathBuf)>> {
    let Some(spec) = extra else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for part in spec.split(',').filter(|p| !p.is_empty()) {
        let Some((label, path)) = part.split_once(':') else {
            bail!("invalid scenario '{part}', expected label:path");
        };
        out.push((label.to_string(), PathBuf::from(path)));
    }
    Ok(out)
}

fn resolution_artifact(label: &str, dists: ResolutionDistributions) -> (String, serde_json::Value) {
    let summaries: serde_json::Value = dists
        .regions
        .iter()
        .map(|(region, res)| {
            (
                region.to_string(),
                json!({
                    "energy": { "mean": res.energy.mean(), "std_dev": res.energy.std_dev(), "entries": res.energy.entries },
                    "mass": { "mean": res.mass.mean(), "std_dev": res.mass.std_dev(), "entries": res.mass.entries },
                }),
            )
        })
        .collect::<serde_json::Map<String, serde_json::Value>>()
        .into();

    let value = json!({
        "label": label,
        "applied": dists.applied,
        "summaries": summaries,
        "distributions": dists,
    });
    (format!("resolution_{label}.json"), value)
}

/// Write one artifact to the output directory, or pretty-print to stdout.
fn emit(output: Option<&Path>, name: &str, value: &serde_json::Value) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value)?;
    match output {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(name);
            fs::write(&path, pretty)?;
            tracing::info!(path = %path.display(), "artifact written");
        }
        None => println!("{pretty}"),
    }
    Ok(())
}
