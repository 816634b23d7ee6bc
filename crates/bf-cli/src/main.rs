//! baseflow CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod input;

#[derive(Parser)]
#[command(name = "baseflow")]
#[command(about = "baseflow - recession analysis of streamflow records")]
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
    /// Detect recession events
    Events {
        /// Input series JSON: {"time", "discharge", "rainfall"?}
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Detect events and fit each with the exponential time-step method
    FitEvents {
        /// Input series JSON: {"time", "discharge", "rainfall"?}
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Full analysis: events, per-event fits and the population fit
    Analyze {
        /// Input series JSON: {"time", "discharge", "rainfall"?}
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bootstrap confidence bounds for a and b.
        #[arg(long)]
        bootstrap: bool,

        /// Bootstrap replicates (overrides the configuration).
        #[arg(long)]
        n_reps: Option<usize>,

        /// Bootstrap seed (overrides the configuration).
        #[arg(long)]
        seed: Option<u64>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Events { input, config, output } => {
            cmd_events(&input, config.as_ref(), output.as_ref())
        }
        Commands::FitEvents { input, config, output, threads } => {
            cmd_fit_events(&input, config.as_ref(), output.as_ref(), threads)
        }
        Commands::Analyze { input, config, output, bootstrap, n_reps, seed, threads } => {
            cmd_analyze(&input, config.as_ref(), output.as_ref(), bootstrap, n_reps, seed, threads)
        }
        Commands::Version => {
            println!("baseflow {}", bf_core::VERSION);
            Ok(())
        }
    }
}

fn set_threads(threads: usize) {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
}

fn cmd_events(input: &PathBuf, config: Option<&PathBuf>, output: Option<&PathBuf>) -> Result<()> {
    let series = input::read_series(input)?;
    let cfg = input::read_config(config.map(|p| p.as_path()))?;
    let info = bf_inference::find_events(&series, &cfg.events)?;
    tracing::info!(events = info.n_events(), "event detection done");

    let mut value = serde_json::to_value(&info)?;
    value["n_events"] = serde_json::json!(info.n_events());
    write_json(output, value)
}

fn cmd_fit_events(
    input: &PathBuf,
    config: Option<&PathBuf>,
    output: Option<&PathBuf>,
    threads: usize,
) -> Result<()> {
    set_threads(threads);
    let series = input::read_series(input)?;
    let cfg = input::read_config(config.map(|p| p.as_path()))?;
    let info = bf_inference::find_events(&series, &cfg.events)?;
    let events = bf_inference::extract_events(&series, &info);
    let fits = bf_inference::fit_events(&events, &cfg.fit);

    write_json(
        output,
        serde_json::json!({
            "n_events": info.n_events(),
            "events": events,
            "fits": fits,
        }),
    )
}

fn cmd_analyze(
    input: &PathBuf,
    config: Option<&PathBuf>,
    output: Option<&PathBuf>,
    bootstrap: bool,
    n_reps: Option<usize>,
    seed: Option<u64>,
    threads: usize,
) -> Result<()> {
    set_threads(threads);
    let series = input::read_series(input)?;
    let mut cfg = input::read_config(config.map(|p| p.as_path()))?;
    cfg.global.bootstrap |= bootstrap;
    if let Some(n) = n_reps {
        cfg.global.n_reps = n;
    }
    if let Some(s) = seed {
        cfg.global.seed = s;
    }

    let analysis = bf_inference::analyze(&series, &cfg)?;
    match &analysis.global {
        Some(g) => tracing::info!(b = g.b, b_source = ?g.b_source, a = g.a, tau0 = g.tau0, "population fit done"),
        None => tracing::warn!("no population fit"),
    }
    write_json(output, serde_json::to_value(&analysis)?)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
