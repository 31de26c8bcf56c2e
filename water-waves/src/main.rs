use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use water_waves::{Config, Simulation};

/// Headless water surface simulation with random splashes
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of frames to run
    #[arg(short, long)]
    frames: Option<usize>,

    /// Override the random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose, args.quiet);

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(frames) = args.frames {
        config.run.frames = frames;
    }
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    config.log_summary();

    let mut sim = Simulation::new(config)?;
    sim.run()?;

    Ok(())
}
