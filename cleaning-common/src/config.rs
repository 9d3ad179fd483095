use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::model_params::ModelParams;
use crate::position::Position;
use std::path::Path;

// Configuration for the grid dimensions
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
}

// Agent population, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AgentsConfig {
    pub vacuums: u32,
    pub dirt_percentage: u32,
    #[serde(default = "default_origin")]
    pub origin_x: u32,
    #[serde(default = "default_origin")]
    pub origin_y: u32,
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub max_ticks: u32,
}

// Settings for a single run
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
}

// Parameter sweep for the batch runner
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_vacuum_counts")]
    pub vacuum_counts: Vec<u32>,
    #[serde(default = "default_dirt_percentages")]
    pub dirt_percentages: Vec<u32>,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Bincode,
    Messagepack,
}

impl OutputFormat {
    /// File extension used for exports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::Messagepack => "msgpack",
        }
    }
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_metrics: bool,
    #[serde(default = "default_true")]
    pub save_batch: bool,
    #[serde(default)]
    pub save_frames: bool,
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

fn default_origin() -> u32 {
    1
}

fn default_seed() -> u64 {
    42
}

fn default_vacuum_counts() -> Vec<u32> {
    vec![5, 10, 15]
}

fn default_dirt_percentages() -> Vec<u32> {
    vec![10, 20, 30, 40, 50]
}

fn default_iterations() -> u32 {
    100
}

fn default_base_filename() -> String {
    "cleaning".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Json
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig { seed: default_seed() }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            vacuum_counts: default_vacuum_counts(),
            dirt_percentages: default_dirt_percentages(),
            iterations: default_iterations(),
            parallel: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_metrics: true,
            save_batch: true,
            save_frames: false,
            format: default_format(),
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub agents: AgentsConfig,
    pub timing: TimingConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every parameter that could prevent a run from starting.
    /// Each batch combination is validated up front so a sweep never fails halfway.
    pub fn validate(&self) -> Result<()> {
        self.get_model_params()?;

        if self.batch.iterations == 0 {
            anyhow::bail!("batch.iterations must be greater than 0.");
        }
        if self.batch.vacuum_counts.is_empty() || self.batch.dirt_percentages.is_empty() {
            anyhow::bail!("batch.vacuum_counts and batch.dirt_percentages must not be empty.");
        }
        for (vacuums, dirt_percentage) in self.batch_combinations() {
            self.model_params_for(vacuums, dirt_percentage)?;
        }
        if self.output.base_filename.trim().is_empty() {
            anyhow::bail!("output.base_filename must not be empty.");
        }
        Ok(())
    }

    /// Converts the configuration into the parameters of a single run.
    pub fn get_model_params(&self) -> Result<ModelParams> {
        self.model_params_for(self.agents.vacuums, self.agents.dirt_percentage)
    }

    /// Parameters for one batch combination: grid, origin and tick budget stay fixed.
    pub fn model_params_for(&self, vacuums: u32, dirt_percentage: u32) -> Result<ModelParams> {
        ModelParams::with_origin_at(
            self.grid.width,
            self.grid.height,
            vacuums,
            dirt_percentage,
            self.timing.max_ticks,
            Position::new(self.agents.origin_x, self.agents.origin_y),
        )
    }

    /// The cross product of sweep values, vacuum count major.
    pub fn batch_combinations(&self) -> Vec<(u32, u32)> {
        self.batch
            .vacuum_counts
            .iter()
            .flat_map(|&n| self.batch.dirt_percentages.iter().map(move |&d| (n, d)))
            .collect()
    }
}
