//! Trains a population of drivers on a ring track.
//!
//! Usage:
//!   cargo run --release --bin evo-train -- --ticks 50000
//!   RUST_LOG=evo_drive=debug cargo run --bin evo-train -- --resume --brain best.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use evo_drive::{
    agent::*,
    config::{Bootstrap, TrainerConfig},
    world::*,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod track;

use track::RingTrack;

#[derive(Parser)]
#[command(name = "evo-train")]
#[command(about = "Evolve checkpoint-driving networks on a ring track")]
struct Args {
    /// Trainer config (JSON), defaults are used when omitted
    #[arg(long)]
    config:       Option<PathBuf>,
    /// File the best brain is saved to
    #[arg(long, default_value = "best_brain.json")]
    brain:        PathBuf,
    /// Start from the saved brain instead of random networks
    #[arg(long)]
    resume:       bool,
    #[arg(long, default_value_t = 20_000)]
    ticks:        u64,
    /// Simulation step in seconds
    #[arg(long, default_value_t = 0.02)]
    dt:           f32,
    #[arg(long)]
    seed:         Option<u64>,
    #[arg(long)]
    population:   Option<usize>,
    /// Ticks between progress reports
    #[arg(long, default_value_t = 500)]
    report_every: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => TrainerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TrainerConfig::default(),
    };
    if args.resume {
        config.bootstrap = Bootstrap::Resume;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(population) = args.population {
        config.population_size = population;
    }
    config.validate().context("invalid trainer config")?;
    info!(
        sensors = config.layer_sizes[0] - PROPRIOCEPTION_WIDTH,
        brain = %args.brain.display(),
        "preparing ring track"
    );

    let store = JsonFileStore::new(&args.brain);
    let mut trainer =
        Trainer::new(config, RingTrack::new(), store).context("failed to start training")?;
    let report_every = args.report_every.max(1);
    for tick in 0..args.ticks {
        if let TickOutcome::CheckpointAdvanced { checkpoint, lap } = trainer.tick(args.dt)? {
            info!(tick, checkpoint, lap, "new target");
        }
        if tick % report_every == 0 {
            let status = trainer.status();
            info!(
                tick,
                checkpoint = status.checkpoint,
                lap = status.lap,
                best = status.best_distance,
                best_this_checkpoint = status.best_distance_this_checkpoint,
                budget = status.time_budget,
                loops = status.loops_completed,
                "progress"
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&trainer.status())?);
    Ok(())
}
