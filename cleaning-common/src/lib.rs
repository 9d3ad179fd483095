pub mod config;
pub mod model_params;
pub mod portrayal;
pub mod position;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, GridConfig, AgentsConfig, TimingConfig, RunConfig, BatchConfig, OutputConfig, OutputFormat};
pub use model_params::ModelParams;
pub use portrayal::{Portrayal, Shape};
pub use position::Position;
pub use snapshot::{AgentKind, AgentView, BatchRow, GridFrame, MetricsRecord, RunSummary, Termination};
