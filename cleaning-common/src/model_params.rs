use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::position::Position;

/// Validated parameters of a single run, derived from the configuration.
/// Construction is the only place a run can be rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    // Grid
    pub width: u32,
    pub height: u32,
    pub num_cells: u32,
    pub origin: Position, // Start cell shared by every vacuum

    // Agents
    pub vacuums: u32,
    pub dirt_percentage: u32,
    pub dirty_cells: u32, // floor(dirt_percentage * num_cells / 100)

    // Time
    pub max_ticks: u32,
}

impl ModelParams {
    /// Builds run parameters with the default origin `(1, 1)`.
    pub fn new(width: u32, height: u32, vacuums: u32, dirt_percentage: u32, max_ticks: u32) -> Result<Self> {
        Self::with_origin_at(width, height, vacuums, dirt_percentage, max_ticks, Position::new(1, 1))
    }

    /// Builds run parameters with an explicit vacuum start cell.
    pub fn with_origin_at(
        width: u32,
        height: u32,
        vacuums: u32,
        dirt_percentage: u32,
        max_ticks: u32,
        origin: Position,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            anyhow::bail!("grid width and height must be positive (got {}x{}).", width, height);
        }
        if vacuums == 0 {
            anyhow::bail!("vacuums must be greater than 0.");
        }
        if max_ticks == 0 {
            anyhow::bail!("max_ticks must be greater than 0.");
        }
        if dirt_percentage > 100 {
            anyhow::bail!("dirt_percentage must be within [0, 100] (got {}).", dirt_percentage);
        }

        let num_cells = width
            .checked_mul(height)
            .ok_or_else(|| anyhow::anyhow!("grid {}x{} is too large.", width, height))?;

        let dirty_cells = (dirt_percentage as u64 * num_cells as u64 / 100) as u32;
        // The origin never starts dirty, so at most num_cells - 1 cells can.
        if dirty_cells > num_cells - 1 {
            anyhow::bail!(
                "dirt_percentage {} needs {} dirty cells but only {} cells are available besides the origin.",
                dirt_percentage,
                dirty_cells,
                num_cells - 1
            );
        }

        Self {
            width,
            height,
            num_cells,
            origin: Position::new(0, 0),
            vacuums,
            dirt_percentage,
            dirty_cells,
            max_ticks,
        }
        .with_origin(origin.x, origin.y)
    }

    /// Moves the vacuum start cell. Fails if it lies outside the grid.
    pub fn with_origin(mut self, x: u32, y: u32) -> Result<Self> {
        let origin = Position::new(x, y);
        if !self.contains(origin) {
            anyhow::bail!(
                "origin {} lies outside the {}x{} grid.",
                origin,
                self.width,
                self.height
            );
        }
        self.origin = origin;
        Ok(self)
    }

    /// True if `pos` is a cell of this grid.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Percentage of cells that are clean given `dirty` remaining dirty cells.
    pub fn percent_clean(&self, dirty: u32) -> f64 {
        100.0 - (dirty as f64 * 100.0 / self.num_cells as f64)
    }
}
