use cleaning_common::Position;
use crate::agent::AgentId;

/// Spatial index over agents on a bounded, non-wrapping grid.
/// Each cell holds the ids of every agent standing on it.
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Vec<AgentId>>, // Indexed by cell_idx
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Vec::new(); (width * height) as usize],
        }
    }

    // Calculates the 1D cell index for a given position
    #[inline(always)]
    fn cell_idx(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// The Moore neighborhood of `pos` clipped to the grid, optionally with `pos` itself.
    /// Cells outside the grid are dropped, never wrapped.
    pub fn neighborhood(&self, pos: Position, include_center: bool) -> Vec<Position> {
        let mut out = Vec::with_capacity(9);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 && !include_center {
                    continue;
                }
                if let Some(neighbor) = pos.offset(dx, dy, self.width, self.height) {
                    out.push(neighbor);
                }
            }
        }
        out
    }

    /// Ids of the agents currently at `pos`, in placement order.
    pub fn occupants(&self, pos: Position) -> &[AgentId] {
        &self.cells[self.cell_idx(pos)]
    }

    pub fn place(&mut self, agent: AgentId, pos: Position) {
        let idx = self.cell_idx(pos);
        self.cells[idx].push(agent);
    }

    /// Removes `agent` from `pos`. Returns false if it was not there.
    pub fn remove(&mut self, agent: AgentId, pos: Position) -> bool {
        let idx = self.cell_idx(pos);
        let cell = &mut self.cells[idx];
        match cell.iter().position(|&id| id == agent) {
            Some(i) => {
                cell.remove(i);
                true
            }
            None => {
                log::error!("Agent {} not found at {} during removal.", agent, pos);
                false
            }
        }
    }

    pub fn move_agent(&mut self, agent: AgentId, from: Position, to: Position) {
        if from == to {
            return;
        }
        if self.remove(agent, from) {
            self.place(agent, to);
        }
    }
}
