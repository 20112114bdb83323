//! highway — run the cellular-automaton traffic simulator from the command
//! line.
//!
//! Loads a JSON run configuration and an `x,cdf` interarrival table, applies
//! any command-line overrides, runs the selected strategy, and prints the
//! run report.
//!
//! ```text
//! cargo run --release -p highway -- --config demos/highway/data/config.json \
//!     --strategy distributed --processes 4
//! RUST_LOG=debug cargo run -p highway -- --max-time 200
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use ca_core::{CaConfig, EmpiricalCdf, Strategy, Tick};
use ca_road::{Road, VehicleRegistry};
use ca_sim::{RunReport, SimBuilder, SimObserver, StepSummary, run_sharded};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StrategyArg {
    Sequential,
    Shared,
    Distributed,
}

impl From<StrategyArg> for Strategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::Sequential  => Strategy::Sequential,
            StrategyArg::Shared      => Strategy::SharedMemory,
            StrategyArg::Distributed => Strategy::Distributed,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "highway", about = "Multi-lane cellular-automaton traffic simulation")]
struct Args {
    /// JSON run configuration; built-in defaults if omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Interarrival-time table (CSV with an `x,cdf` header).
    #[arg(long, default_value = "demos/highway/data/interarrival-cdf.csv")]
    cdf: PathBuf,
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    /// Worker threads for the shared-memory strategy.
    #[arg(long)]
    workers: Option<usize>,
    /// Rank count for the distributed strategy.
    #[arg(long)]
    processes: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Steps to simulate.
    #[arg(long)]
    max_time: Option<u64>,
    /// Log a progress line every this many steps (0 disables).
    #[arg(long, default_value_t = 1_000)]
    progress: u64,
    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<CaConfig> {
        let mut config = match &self.config {
            Some(path) => CaConfig::load_json(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => CaConfig::default(),
        };
        if let Some(s) = self.strategy {
            config.strategy = s.into();
        }
        if let Some(n) = self.workers {
            config.num_workers = Some(n);
        }
        if let Some(n) = self.processes {
            config.num_processes = n;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(t) = self.max_time {
            config.max_time = t;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Progress observer ─────────────────────────────────────────────────────────

struct ProgressLogger {
    interval: u64,
}

impl SimObserver for ProgressLogger {
    fn on_step_end(&mut self, step: Tick, summary: &StepSummary, road: &Road, _vehicles: &VehicleRegistry) {
        if self.interval > 0 && (step.0 + 1).is_multiple_of(self.interval) {
            info!(
                step = step.0 + 1,
                first_site = road.shard().start,
                live = summary.live,
                "progress"
            );
        }
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = args.resolve_config()?;
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let cdf = EmpiricalCdf::load_csv(&args.cdf)
        .with_context(|| format!("loading interarrival table {}", args.cdf.display()))?;
    info!(
        strategy = %config.strategy,
        road_length = config.road_length,
        lanes = config.num_lanes,
        steps = config.max_time,
        cdf_points = cdf.len(),
        "starting run"
    );

    let report: RunReport = match config.strategy {
        Strategy::Sequential | Strategy::SharedMemory => {
            let mut sim = SimBuilder::new(config, cdf).build()?;
            sim.run(&mut ProgressLogger { interval: args.progress })?
        }
        Strategy::Distributed => {
            let ranks = config.num_processes;
            let sims = SimBuilder::new(config, cdf).build_sharded(ranks)?;
            let interval = args.progress;
            run_sharded(sims, |_| ProgressLogger { interval })?.report
        }
    };

    println!("{report}");
    Ok(())
}
