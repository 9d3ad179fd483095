use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{debug, error, info, trace};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::time::Instant;

// Define modules used by main
mod agent;
mod batch;
mod grid;
mod model;
mod output;

use cleaning_common::{GridFrame, SimulationConfig, Termination};
use model::CleaningModel;
use output::RunExport;

/// Vacuum cleaning simulation engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config.toml file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the seed from the config file
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single model to completion and export its metrics
    Run,
    /// Run the parameter sweep and export one row per trial
    Batch,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    let args = Args::parse();
    info!("Starting Cleaning Simulation Engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    debug!("Configuration: {:#?}", config);

    let result = match args.command {
        Command::Run => run_single(&config),
        Command::Batch => run_sweep(&config),
    };
    if let Err(e) = &result {
        error!("Simulation failed: {:#}", e);
    }
    result
}

fn run_single(config: &SimulationConfig) -> Result<()> {
    let params = config.get_model_params()?;
    debug!("Model Parameters: {:#?}", params);

    let rng = StdRng::seed_from_u64(config.run.seed);
    let mut model = CleaningModel::new(params, rng)?;
    info!(
        "Model initialized: {}x{} grid, {} vacuums, {} dirty cells, budget {} ticks (seed {}).",
        model.params().width,
        model.params().height,
        model.params().vacuums,
        model.dirty_cells(),
        model.params().max_ticks,
        config.run.seed
    );

    // --- Simulation Loop ---
    let start_time = Instant::now();
    let mut frames: Vec<GridFrame> = Vec::new();
    if config.output.save_frames {
        frames.push(model.frame());
    }

    let summary = loop {
        let finished = model.step();
        trace!("Tick {} | dirty cells: {}", model.ticks(), model.dirty_cells());
        if config.output.save_frames {
            frames.push(model.frame());
        }
        if let Some(summary) = finished {
            break summary;
        }
    };
    let total_duration = start_time.elapsed();

    match summary.termination {
        Termination::Cleaned => info!("TIME NEEDED: {} ticks", summary.ticks),
        Termination::TimeLimit => info!("TIME LIMIT: {} ticks", summary.ticks),
    }
    info!("CLEAN CELLS: {}", summary.clean_cells);
    info!("PERCENTAGE CLEAN CELLS: {:.2}%", summary.percent_clean);
    info!("AGENT MOVES: {}", summary.agent_moves);
    debug!("Run finished in {:.3} ms.", total_duration.as_secs_f64() * 1000.0);

    // --- Save Recorded Data ---
    let format = config.output.format;
    let base = &config.output.base_filename;
    if config.output.save_metrics {
        let path = output::export_path(base, "metrics", format);
        let export = RunExport {
            params: model.params(),
            summary: &summary,
            metrics: model.metrics(),
        };
        output::write_run(&path, format, &export)?;
    } else {
        info!("Skipping saving metrics as per config (save_metrics is false).");
    }
    if config.output.save_frames {
        let path = output::export_path(base, "frames", format);
        output::write_frames(&path, format, &frames)?;
    }

    info!("Simulation Complete.");
    Ok(())
}

fn run_sweep(config: &SimulationConfig) -> Result<()> {
    if config.batch.parallel {
        info!("Using {} Rayon threads.", rayon::current_num_threads());
    }

    let start_time = Instant::now();
    let rows = batch::run_batch(config)?;
    let total_duration = start_time.elapsed();
    info!(
        "Batch of {} trials finished in {:.3} seconds.",
        rows.len(),
        total_duration.as_secs_f64()
    );

    for s in batch::summarize(&rows) {
        info!(
            "N={:>3} dirt={:>3}% | runs: {} | mean ticks: {:6.2} | mean clean cells: {:6.2} | mean moves: {:8.2} | fully cleaned: {:5.1}%",
            s.vacuums,
            s.dirt_percentage,
            s.runs,
            s.mean_ticks,
            s.mean_clean_cells,
            s.mean_agent_moves,
            s.cleaned_fraction * 100.0
        );
    }

    if config.output.save_batch {
        let path = PathBuf::from(format!("{}_batch.csv", config.output.base_filename));
        output::write_batch_csv(&path, &rows)?;
    } else {
        info!("Skipping saving batch results as per config (save_batch is false).");
    }

    info!("Batch Complete.");
    Ok(())
}
