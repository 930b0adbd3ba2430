//! Motor CLI - headless animation scenarios and curve inspection
//!
//! Provides:
//! - `motor run`: play a JSON scenario against the animation scheduler and
//!   report final values, render counts and completion events
//! - `motor curves`: sample the named easing curves

mod config;
mod report;
mod runner;
mod scenario;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use motor_animation::Easing;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::MotorConfig;
use crate::runner::run_loaded_scenario;
use crate::scenario::Scenario;

/// Headless driver for the Motor animation engine
#[derive(Parser, Debug)]
#[command(name = "motor")]
#[command(about = "Run animation scenarios headlessly and inspect easing curves")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a scenario file and print its report
    Run {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also write the report to this relative path
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Use the wall clock instead of logical time
        #[arg(long)]
        realtime: bool,
    },

    /// Print sampled values of easing curves as JSON
    Curves {
        /// Samples per curve, endpoints included
        #[arg(short, long, default_value = "11")]
        samples: usize,

        /// Only these curves (default: all named curves)
        #[arg(short, long)]
        easing: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            config,
            report,
            realtime,
        } => cmd_run(scenario, config, report, realtime),
        Commands::Curves { samples, easing } => cmd_curves(samples, &easing),
    }
}

fn cmd_run(
    scenario_path: PathBuf,
    config_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
    realtime: bool,
) -> Result<()> {
    let config = MotorConfig::load_or_default(config_path.as_deref())?;
    let scenario = Scenario::from_path(&scenario_path)?;
    tracing::info!(
        "Running {} ({} steps, {} owners)",
        scenario_path.display(),
        scenario.steps.len(),
        scenario.owners.len()
    );

    let outcome = run_loaded_scenario(&scenario, &config, realtime)?;
    let report = outcome.report();
    report.write_to_writer(&mut std::io::stdout().lock())?;
    if let Some(path) = report_path {
        report.write_to_path(&path)?;
        tracing::info!("Report written to {}", path.display());
    }

    if outcome.is_failed() {
        bail!(
            "scenario failed at step {}: {}",
            report.failed_step_index.unwrap_or_default(),
            report.message.as_deref().unwrap_or("unknown error")
        );
    }
    tracing::info!("Scenario passed in {} frames", report.elapsed_frames);
    Ok(())
}

fn cmd_curves(samples: usize, names: &[String]) -> Result<()> {
    if samples < 2 {
        bail!("--samples must be at least 2");
    }

    let curves: Vec<(String, Easing)> = if names.is_empty() {
        Easing::NAMED
            .iter()
            .map(|(name, easing)| (name.to_string(), *easing))
            .collect()
    } else {
        names
            .iter()
            .map(|name| Ok((name.clone(), name.parse::<Easing>()?)))
            .collect::<Result<_>>()?
    };

    let table: IndexMap<String, Vec<f64>> = curves
        .into_iter()
        .map(|(name, easing)| (name, sample_curve(easing, samples)))
        .collect();
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}

/// Evenly spaced samples over [0, 1], endpoints included
fn sample_curve(easing: Easing, samples: usize) -> Vec<f64> {
    let last = (samples - 1) as f64;
    (0..samples).map(|i| easing.apply(i as f64 / last)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_curve_endpoints() {
        let samples = sample_curve(Easing::QuadIn, 5);
        assert_eq!(samples, vec![0.0, 0.0625, 0.25, 0.5625, 1.0]);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "motor",
            "run",
            "scenarios/ease.json",
            "--report",
            "out/report.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { scenario, report, realtime, .. } => {
                assert_eq!(scenario, PathBuf::from("scenarios/ease.json"));
                assert_eq!(report, Some(PathBuf::from("out/report.json")));
                assert!(!realtime);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
