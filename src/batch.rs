use cleaning_common::{BatchRow, ModelParams, SimulationConfig, Termination};
use crate::model::CleaningModel;
use anyhow::Result;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// One trial of the sweep: a parameter combination and an iteration number.
#[derive(Debug, Clone)]
pub struct Trial {
    /// Position in sweep order; also offsets the base seed.
    pub index: u64,
    pub iteration: u32,
    pub params: ModelParams,
}

/// Aggregate of every iteration of one parameter combination.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationSummary {
    pub vacuums: u32,
    pub dirt_percentage: u32,
    pub runs: u32,
    pub mean_ticks: f64,
    pub mean_clean_cells: f64,
    pub mean_agent_moves: f64,
    pub cleaned_fraction: f64, // Share of runs that ended fully clean
}

/// Expands the sweep into trials, combination major, iteration minor.
/// Every combination is validated here, before any trial runs.
pub fn plan_trials(config: &SimulationConfig) -> Result<Vec<Trial>> {
    let iterations = config.batch.iterations;
    let mut trials = Vec::new();
    for (vacuums, dirt_percentage) in config.batch_combinations() {
        let params = config.model_params_for(vacuums, dirt_percentage)?;
        for iteration in 0..iterations {
            trials.push(Trial {
                index: trials.len() as u64,
                iteration,
                params: params.clone(),
            });
        }
    }
    Ok(trials)
}

/// Runs one trial to completion and keeps only its final metrics record.
pub fn run_trial(trial: &Trial, base_seed: u64) -> Result<BatchRow> {
    let rng = StdRng::seed_from_u64(base_seed.wrapping_add(trial.index));
    let mut model = CleaningModel::new(trial.params.clone(), rng)?;
    let summary = model.run_to_completion();
    let last = model
        .metrics()
        .last()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("trial {} recorded no metrics", trial.index))?;

    debug!(
        "Trial {} (N={}, dirt={}%, iteration {}): {:?} after {} ticks, {} moves.",
        trial.index,
        trial.params.vacuums,
        trial.params.dirt_percentage,
        trial.iteration,
        summary.termination,
        summary.ticks,
        summary.agent_moves
    );

    Ok(BatchRow {
        iteration: trial.iteration,
        vacuums: trial.params.vacuums,
        dirt_percentage: trial.params.dirt_percentage,
        tick: last.tick,
        remaining_dirt: last.remaining_dirt,
        clean_cells: last.clean_cells,
        dirty_cells: last.dirty_cells,
        agent_moves: last.agent_moves,
        termination: summary.termination,
    })
}

/// Runs the whole sweep. Rows come back in sweep order whether or not the
/// trials run in parallel.
pub fn run_batch(config: &SimulationConfig) -> Result<Vec<BatchRow>> {
    let trials = plan_trials(config)?;
    let seed = config.run.seed;
    info!(
        "Running {} trials ({} combinations x {} iterations){}.",
        trials.len(),
        config.batch_combinations().len(),
        config.batch.iterations,
        if config.batch.parallel { " on the rayon pool" } else { "" }
    );

    if config.batch.parallel {
        trials.par_iter().map(|t| run_trial(t, seed)).collect()
    } else {
        trials.iter().map(|t| run_trial(t, seed)).collect()
    }
}

/// Groups rows by (vacuums, dirt_percentage), keeping first-seen order.
pub fn summarize(rows: &[BatchRow]) -> Vec<CombinationSummary> {
    let mut summaries: Vec<CombinationSummary> = Vec::new();
    for row in rows {
        let idx = match summaries
            .iter()
            .position(|s| s.vacuums == row.vacuums && s.dirt_percentage == row.dirt_percentage)
        {
            Some(idx) => idx,
            None => {
                summaries.push(CombinationSummary {
                    vacuums: row.vacuums,
                    dirt_percentage: row.dirt_percentage,
                    runs: 0,
                    mean_ticks: 0.0,
                    mean_clean_cells: 0.0,
                    mean_agent_moves: 0.0,
                    cleaned_fraction: 0.0,
                });
                summaries.len() - 1
            }
        };
        // Accumulate sums here, divide once at the end.
        let s = &mut summaries[idx];
        s.runs += 1;
        s.mean_ticks += row.tick as f64;
        s.mean_clean_cells += row.clean_cells as f64;
        s.mean_agent_moves += row.agent_moves as f64;
        if row.termination == Termination::Cleaned {
            s.cleaned_fraction += 1.0;
        }
    }
    for s in &mut summaries {
        let n = s.runs as f64;
        s.mean_ticks /= n;
        s.mean_clean_cells /= n;
        s.mean_agent_moves /= n;
        s.cleaned_fraction /= n;
    }
    summaries
}
