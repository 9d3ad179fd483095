use cleaning_common::{AgentKind, AgentView, Position};
use crate::grid::Grid;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::fmt;

/// Dense agent identifier. Vacuums come first, then dirt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an agent is, with the state only that kind needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Vacuum { moves: u64 },
    Dirt,
}

/// Outcome of one agent's turn. The model applies it; agents never mutate shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing happened (dirt, or a vacuum with no candidate cell).
    Idle,
    /// The vacuum removes this dirt agent from its own cell.
    Cleaned { dirt: AgentId },
    /// The vacuum commits a move. `to` may equal `from` when it chose to stay.
    Moved { from: Position, to: Position },
    /// Another vacuum holds the chosen cell; the vacuum stays and nothing is counted.
    Blocked { target: Position },
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub pos: Position,
    pub role: Role,
}

impl Agent {
    pub fn vacuum(id: AgentId, pos: Position) -> Self {
        Self { id, pos, role: Role::Vacuum { moves: 0 } }
    }

    pub fn dirt(id: AgentId, pos: Position) -> Self {
        Self { id, pos, role: Role::Dirt }
    }

    pub fn kind(&self) -> AgentKind {
        match self.role {
            Role::Vacuum { .. } => AgentKind::Vacuum,
            Role::Dirt => AgentKind::Dirt,
        }
    }

    /// Personal move counter; always 0 for dirt.
    pub fn moves(&self) -> u64 {
        match self.role {
            Role::Vacuum { moves } => moves,
            Role::Dirt => 0,
        }
    }

    pub fn view(&self) -> AgentView {
        AgentView { id: self.id.0, kind: self.kind(), pos: self.pos }
    }

    /// Decides this agent's action for the current tick.
    ///
    /// A vacuum first cleans one dirt agent on its own cell, if there is one.
    /// Otherwise it picks a cell of its neighborhood (its own cell included)
    /// uniformly at random and moves there unless another vacuum occupies it.
    pub fn decide<R: Rng + ?Sized>(&self, grid: &Grid, population: &Population, rng: &mut R) -> Effect {
        match self.role {
            Role::Dirt => Effect::Idle,
            Role::Vacuum { .. } => {
                // --- Clean ---
                let dirt = grid
                    .occupants(self.pos)
                    .iter()
                    .copied()
                    .find(|&id| population.kind_of(id) == Some(AgentKind::Dirt));
                if let Some(dirt) = dirt {
                    return Effect::Cleaned { dirt };
                }

                // --- Move ---
                let candidates = grid.neighborhood(self.pos, true);
                let Some(&target) = candidates.choose(rng) else {
                    return Effect::Idle;
                };
                let blocked = grid
                    .occupants(target)
                    .iter()
                    .any(|&id| id != self.id && population.kind_of(id) == Some(AgentKind::Vacuum));
                if blocked {
                    Effect::Blocked { target }
                } else {
                    Effect::Moved { from: self.pos, to: target }
                }
            }
        }
    }

    fn record_move(&mut self, to: Position) {
        self.pos = to;
        if let Role::Vacuum { moves } = &mut self.role {
            *moves += 1;
        }
    }
}

/// Every agent of a run, addressed by id. Cleaned dirt leaves a `None` behind
/// so ids stay stable.
#[derive(Debug, Clone, Default)]
pub struct Population {
    agents: Vec<Option<Agent>>,
    live: usize,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an agent. Ids must be handed out densely starting at 0.
    pub fn insert(&mut self, agent: Agent) {
        debug_assert_eq!(agent.id.0 as usize, self.agents.len(), "agent ids must be dense");
        self.agents.push(Some(agent));
        self.live += 1;
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.0 as usize).and_then(|a| a.as_ref())
    }

    pub fn kind_of(&self, id: AgentId) -> Option<AgentKind> {
        self.get(id).map(Agent::kind)
    }

    /// Removes a dirt agent. Vacuums persist for the whole run and are never removed.
    pub fn remove_dirt(&mut self, id: AgentId) -> Option<Agent> {
        let slot = self.agents.get_mut(id.0 as usize)?;
        if !matches!(slot, Some(agent) if agent.kind() == AgentKind::Dirt) {
            return None;
        }
        self.live -= 1;
        slot.take()
    }

    /// Moves a vacuum and bumps its move counter.
    pub fn record_move(&mut self, id: AgentId, to: Position) {
        if let Some(Some(agent)) = self.agents.get_mut(id.0 as usize) {
            agent.record_move(to);
        }
    }

    /// Ids of every agent still on the grid, in id order.
    pub fn live_ids(&self) -> Vec<AgentId> {
        self.iter().map(|a| a.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().flatten()
    }

    pub fn vacuums(&self) -> impl Iterator<Item = &Agent> {
        self.iter().filter(|a| a.kind() == AgentKind::Vacuum)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Sum of every vacuum's personal move counter.
    pub fn total_moves(&self) -> u64 {
        self.vacuums().map(Agent::moves).sum()
    }
}
