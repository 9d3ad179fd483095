use serde::{Serialize, Deserialize};
use crate::position::Position;

/// Metrics recorded once per tick, plus once more when a run terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Tick at which the record was taken (1-based).
    pub tick: u32,
    /// Dirt agents still on the grid.
    pub remaining_dirt: u32,
    /// Total cells minus dirty cells.
    pub clean_cells: u32,
    /// Same value as `remaining_dirt`; kept separate so charts can pair it with `clean_cells`.
    pub dirty_cells: u32,
    /// Sum of the personal move counters of every vacuum.
    pub agent_moves: u64,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Cleaned,
    TimeLimit,
}

/// Final summary emitted when a run terminates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub termination: Termination,
    pub ticks: u32,
    pub clean_cells: u32,
    pub percent_clean: f64,
    pub agent_moves: u64,
}

/// One row of batch output: the final metrics of a single trial plus the
/// parameters it ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    pub iteration: u32,
    pub vacuums: u32,
    pub dirt_percentage: u32,
    pub tick: u32,
    pub remaining_dirt: u32,
    pub clean_cells: u32,
    pub dirty_cells: u32,
    pub agent_moves: u64,
    pub termination: Termination,
}

/// Agent kind as seen by the viewer. Carries no simulation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Vacuum,
    Dirt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: u32,
    pub kind: AgentKind,
    pub pos: Position,
}

/// Positions of every live agent at a given tick, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFrame {
    pub tick: u32,
    pub width: u32,
    pub height: u32,
    pub agents: Vec<AgentView>,
}
