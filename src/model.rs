use cleaning_common::{GridFrame, MetricsRecord, ModelParams, Position, RunSummary, Termination};
use crate::agent::{Agent, AgentId, Effect, Population};
use crate::grid::Grid;
use anyhow::Result;
use log::{debug, trace};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Running,
    Terminated(Termination),
}

/// One run of the cleaning simulation: a grid, its agents, and the counters
/// that decide when the run ends.
///
/// The random source is injected so runs can be reproduced from a seed.
pub struct CleaningModel<R: Rng = StdRng> {
    /// Validated run parameters. `dirty_cells` reflects the actual initial dirt.
    params: ModelParams,
    /// Spatial index over every live agent.
    grid: Grid,
    /// Every agent, addressed by id. Only this model mutates it.
    population: Population,
    /// Drives dirt placement, activation order and vacuum moves.
    rng: R,
    /// Dirt agents still on the grid.
    dirty_cells: u32,
    /// Elapsed ticks.
    ticks: u32,
    state: ModelState,
    /// Ordered metrics log: one record per tick plus the final record.
    metrics: Vec<MetricsRecord>,
    summary: Option<RunSummary>,
}

impl<R: Rng> CleaningModel<R> {
    /// Creates a model with randomly placed dirt.
    pub fn new(params: ModelParams, mut rng: R) -> Result<Self> {
        let dirt = place_dirt(&params, &mut rng);
        Self::with_dirt(params, &dirt, rng)
    }

    /// Creates a model with dirt at exactly the given cells. The dirty count
    /// becomes `dirt.len()`; cells must be distinct, inside the grid and off the origin.
    pub fn with_dirt(mut params: ModelParams, dirt: &[Position], rng: R) -> Result<Self> {
        let mut grid = Grid::new(params.width, params.height);
        let mut seen = HashSet::with_capacity(dirt.len());
        for &pos in dirt {
            if !grid.contains(pos) {
                anyhow::bail!("dirt cell {} lies outside the {}x{} grid.", pos, params.width, params.height);
            }
            if pos == params.origin {
                anyhow::bail!("dirt cell {} coincides with the vacuum origin.", pos);
            }
            if !seen.insert(pos) {
                anyhow::bail!("dirt cell {} listed more than once.", pos);
            }
        }
        params.dirty_cells = dirt.len() as u32;

        let mut population = Population::new();

        // Vacuums take ids 0..vacuums, all stacked on the origin.
        for i in 0..params.vacuums {
            let id = AgentId(i);
            population.insert(Agent::vacuum(id, params.origin));
            grid.place(id, params.origin);
        }
        for (i, &pos) in dirt.iter().enumerate() {
            let id = AgentId(params.vacuums + i as u32);
            population.insert(Agent::dirt(id, pos));
            grid.place(id, pos);
        }

        debug!(
            "Model created: {}x{} grid, {} vacuums at {}, {} dirty cells, budget {} ticks.",
            params.width, params.height, params.vacuums, params.origin, params.dirty_cells, params.max_ticks
        );

        Ok(Self {
            dirty_cells: params.dirty_cells,
            params,
            grid,
            population,
            rng,
            ticks: 0,
            state: ModelState::Running,
            metrics: Vec::new(),
            summary: None,
        })
    }

    /// Advances the model by one tick. Returns the summary on the tick the run terminates.
    /// Does nothing once the model has terminated.
    pub fn step(&mut self) -> Option<RunSummary> {
        if self.state != ModelState::Running {
            return None;
        }

        // --- 1. Advance the clock and record the metrics going into this tick ---
        self.ticks += 1;
        let record = self.current_metrics();
        self.metrics.push(record);

        // --- 2. Activate every live agent in a fresh random order ---
        let mut order = self.population.live_ids();
        order.shuffle(&mut self.rng);

        for id in order {
            // Dirt cleaned earlier in this tick no longer acts.
            let Some(agent) = self.population.get(id) else {
                continue;
            };
            let effect = agent.decide(&self.grid, &self.population, &mut self.rng);
            self.apply(id, effect);
        }

        // --- 3. Termination ---
        if self.dirty_cells == 0 {
            Some(self.terminate(Termination::Cleaned))
        } else if self.ticks == self.params.max_ticks {
            Some(self.terminate(Termination::TimeLimit))
        } else {
            trace!("Tick {}: {} dirty cells left.", self.ticks, self.dirty_cells);
            None
        }
    }

    /// Steps until the model terminates and returns its summary.
    pub fn run_to_completion(&mut self) -> RunSummary {
        if let Some(summary) = self.summary {
            return summary;
        }
        loop {
            if let Some(summary) = self.step() {
                return summary;
            }
        }
    }

    // Single writer for the grid index, the population and the dirty counter.
    fn apply(&mut self, id: AgentId, effect: Effect) {
        match effect {
            Effect::Idle => {}
            Effect::Cleaned { dirt } => {
                let Some(removed) = self.population.remove_dirt(dirt) else {
                    unreachable!("agent {} cleaned {} which is not live dirt", id, dirt);
                };
                self.grid.remove(dirt, removed.pos);
                assert!(self.dirty_cells > 0, "dirty cell count would drop below zero");
                self.dirty_cells -= 1;
                trace!("Tick {}: vacuum {} cleaned {}.", self.ticks, id, removed.pos);
            }
            Effect::Moved { from, to } => {
                debug_assert!(from == to || from.is_adjacent(to), "vacuum {} jumped from {} to {}", id, from, to);
                self.grid.move_agent(id, from, to);
                self.population.record_move(id, to);
            }
            Effect::Blocked { target } => {
                trace!("Tick {}: vacuum {} blocked at {}.", self.ticks, id, target);
            }
        }
    }

    fn terminate(&mut self, termination: Termination) -> RunSummary {
        let clean_cells = self.params.num_cells - self.dirty_cells;
        let summary = RunSummary {
            termination,
            ticks: self.ticks,
            clean_cells,
            percent_clean: match termination {
                Termination::Cleaned => 100.0,
                Termination::TimeLimit => self.params.percent_clean(self.dirty_cells),
            },
            agent_moves: self.population.total_moves(),
        };
        match termination {
            Termination::Cleaned => debug!("Time needed: {} ticks", summary.ticks),
            Termination::TimeLimit => debug!("Time limit: {} ticks", summary.ticks),
        }
        debug!(
            "Clean cells: {} ({:.1}%), agent moves: {}, agents left: {}",
            summary.clean_cells,
            summary.percent_clean,
            summary.agent_moves,
            self.population.live_count()
        );

        let record = self.current_metrics();
        self.metrics.push(record);
        self.state = ModelState::Terminated(termination);
        self.summary = Some(summary);
        summary
    }

    pub fn current_metrics(&self) -> MetricsRecord {
        MetricsRecord {
            tick: self.ticks,
            remaining_dirt: self.dirty_cells,
            clean_cells: self.params.num_cells - self.dirty_cells,
            dirty_cells: self.dirty_cells,
            agent_moves: self.population.total_moves(),
        }
    }

    /// Where every live agent stands right now.
    pub fn frame(&self) -> GridFrame {
        GridFrame {
            tick: self.ticks,
            width: self.params.width,
            height: self.params.height,
            agents: self.population.iter().map(Agent::view).collect(),
        }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    #[cfg(test)]
    pub fn state(&self) -> ModelState {
        self.state
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.state == ModelState::Running
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn dirty_cells(&self) -> u32 {
        self.dirty_cells
    }

    pub fn metrics(&self) -> &[MetricsRecord] {
        &self.metrics
    }

    #[cfg(test)]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[cfg(test)]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

/// Picks the initial dirty cells: every cell except the origin, shuffled,
/// truncated to the dirty count. Cells are distinct by construction.
fn place_dirt<R: Rng + ?Sized>(params: &ModelParams, rng: &mut R) -> Vec<Position> {
    let origin = params.origin;
    let mut cells: Vec<Position> = (0..params.height)
        .flat_map(|y| (0..params.width).map(move |x| Position::new(x, y)))
        .filter(|&pos| pos != origin)
        .collect();
    cells.shuffle(rng);
    cells.truncate(params.dirty_cells as usize);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleaning_common::AgentKind;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn model(width: u32, height: u32, vacuums: u32, dirt: u32, max_ticks: u32, seed: u64) -> CleaningModel {
        let params = ModelParams::new(width, height, vacuums, dirt, max_ticks).unwrap();
        CleaningModel::new(params, StdRng::seed_from_u64(seed)).unwrap()
    }

    fn vacuum_counts(model: &CleaningModel) -> HashMap<Position, usize> {
        let mut counts = HashMap::new();
        for agent in model.population().vacuums() {
            *counts.entry(agent.pos).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_initial_placement() {
        for seed in 0..20 {
            let m = model(10, 10, 5, 30, 50, seed);
            let dirt: Vec<Position> = m
                .population()
                .iter()
                .filter(|a| a.kind() == AgentKind::Dirt)
                .map(|a| a.pos)
                .collect();
            assert_eq!(dirt.len(), 30);
            assert_eq!(m.dirty_cells(), 30);
            let distinct: HashSet<_> = dirt.iter().collect();
            assert_eq!(distinct.len(), 30);
            assert!(!dirt.contains(&Position::new(1, 1)));
            assert!(m.population().vacuums().all(|v| v.pos == Position::new(1, 1)));
            assert_eq!(m.grid().occupants(Position::new(1, 1)).len(), 5);
        }
    }

    #[test]
    fn test_nearly_full_dirt_placement() {
        // 99% of a 10x10 grid: every cell but the origin is dirty.
        let m = model(10, 10, 1, 99, 10, 3);
        assert_eq!(m.dirty_cells(), 99);
        for y in 0..10 {
            for x in 0..10 {
                let pos = Position::new(x, y);
                let dirt_here = m
                    .grid()
                    .occupants(pos)
                    .iter()
                    .filter(|&&id| m.population().kind_of(id) == Some(AgentKind::Dirt))
                    .count();
                assert_eq!(dirt_here, if pos == Position::new(1, 1) { 0 } else { 1 });
            }
        }
    }

    #[test]
    fn test_per_tick_invariants() {
        for seed in 0..30 {
            let mut m = model(10, 10, 5, 30, 50, seed);
            let total = m.params().num_cells;
            let mut last_moves = 0;
            while m.is_running() {
                m.step();
                let metrics = m.current_metrics();
                assert_eq!(metrics.remaining_dirt + metrics.clean_cells, total);
                assert_eq!(metrics.remaining_dirt, metrics.dirty_cells);
                assert!(metrics.agent_moves >= last_moves);
                assert!(m.ticks() <= 50);
                last_moves = metrics.agent_moves;
            }
            for pair in m.metrics().windows(2) {
                assert!(pair[1].agent_moves >= pair[0].agent_moves);
                assert!(pair[1].tick >= pair[0].tick);
            }
        }
    }

    #[test]
    fn test_terminates_on_first_qualifying_tick() {
        for seed in 0..30 {
            let mut m = model(10, 10, 5, 20, 30, seed);
            let summary = m.run_to_completion();
            assert_eq!(summary.ticks, m.ticks());
            // Every record before the final pair was taken while dirt remained and under budget.
            let records = m.metrics();
            assert_eq!(records.len() as u32, m.ticks() + 1);
            for record in &records[..records.len() - 1] {
                assert!(record.remaining_dirt > 0);
                assert!(record.tick <= 30);
            }
            match summary.termination {
                Termination::Cleaned => {
                    assert_eq!(m.dirty_cells(), 0);
                    assert!(summary.ticks <= 30);
                }
                Termination::TimeLimit => {
                    assert_eq!(summary.ticks, 30);
                    assert!(m.dirty_cells() > 0);
                }
            }
        }
    }

    #[test]
    fn test_vacuums_never_share_a_cell_after_moving() {
        let origin = Position::new(1, 1);
        for seed in 0..30 {
            let mut m = model(10, 10, 15, 40, 50, seed);
            let mut stacked = 15;
            while m.is_running() {
                m.step();
                let counts = vacuum_counts(&m);
                for (pos, count) in &counts {
                    if *count > 1 {
                        // Only the starting stack may hold several vacuums, and it only shrinks.
                        assert_eq!(*pos, origin, "seed {} tick {}", seed, m.ticks());
                    }
                }
                let at_origin = counts.get(&origin).copied().unwrap_or(0);
                if at_origin > 1 {
                    assert!(at_origin <= stacked);
                    stacked = at_origin;
                } else {
                    stacked = 1;
                }
            }
        }
    }

    #[test]
    fn test_no_dirt_finishes_on_first_tick() {
        for seed in 0..20 {
            let mut m = model(10, 10, 5, 0, 50, seed);
            let summary = m.run_to_completion();
            assert_eq!(summary.termination, Termination::Cleaned);
            assert_eq!(summary.ticks, 1);
            assert_eq!(summary.percent_clean, 100.0);
            assert_eq!(summary.clean_cells, 100);
            assert!(summary.agent_moves <= 5);
        }
    }

    #[test]
    fn test_reference_scenario() {
        for seed in 0..20 {
            let mut m = model(10, 10, 5, 10, 50, seed);
            assert_eq!(m.dirty_cells(), 10);
            let summary = m.run_to_completion();
            assert!(summary.ticks <= 50);
            match summary.termination {
                Termination::Cleaned => {
                    assert_eq!(m.dirty_cells(), 0);
                    assert_eq!(summary.percent_clean, 100.0);
                }
                Termination::TimeLimit => {
                    let dirty = m.dirty_cells() as f64;
                    assert_eq!(summary.percent_clean, 100.0 - dirty * 100.0 / 100.0);
                }
            }
            let last = m.metrics().last().unwrap();
            assert_eq!(last.remaining_dirt, m.dirty_cells());
            assert_eq!(last.agent_moves, summary.agent_moves);
        }
    }

    #[test]
    fn test_adjacent_dirt_cleaned_within_two_ticks() {
        let params = ModelParams::new(5, 5, 1, 0, 50).unwrap();
        let dirt = Position::new(2, 2);
        let mut hits = 0;
        for seed in 0..200 {
            let mut m = CleaningModel::with_dirt(params.clone(), &[dirt], StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(m.dirty_cells(), 1);

            // Tick 1 is always a move: the origin holds no dirt.
            assert!(m.step().is_none());
            let vacuum = m.population().get(AgentId(0)).unwrap();
            if vacuum.pos == dirt {
                let summary = m.step().expect("vacuum standing on dirt cleans it");
                assert_eq!(summary.termination, Termination::Cleaned);
                assert_eq!(summary.ticks, 2);
                assert_eq!(summary.agent_moves, 1);
                hits += 1;
            }
        }
        // Each seed has a 1 in 9 chance of stepping onto the dirt.
        assert!(hits > 0);
    }

    #[test]
    fn test_one_dirt_removed_per_tick() {
        // Vacuum stands on top of nothing; dirt sits next to it, so each clean costs a tick.
        let params = ModelParams::new(3, 3, 1, 0, 100).unwrap();
        let cells: Vec<Position> = (0..3)
            .flat_map(|y| (0..3).map(move |x| Position::new(x, y)))
            .filter(|&p| p != Position::new(1, 1))
            .collect();
        let mut m = CleaningModel::with_dirt(params, &cells, StdRng::seed_from_u64(9)).unwrap();
        let mut last = m.dirty_cells();
        while m.is_running() {
            m.step();
            assert!(last - m.dirty_cells() <= 1);
            last = m.dirty_cells();
        }
    }

    #[test]
    fn test_step_after_termination_is_noop() {
        let mut m = model(10, 10, 5, 0, 50, 1);
        let summary = m.run_to_completion();
        let records = m.metrics().len();
        assert!(m.step().is_none());
        assert_eq!(m.ticks(), summary.ticks);
        assert_eq!(m.metrics().len(), records);
        assert_eq!(m.run_to_completion(), summary);
        assert_eq!(m.state(), ModelState::Terminated(Termination::Cleaned));
    }

    #[test]
    fn test_moves_visible_to_later_agents_in_same_tick() {
        // Two vacuums share the origin of a 2x1 strip. Whichever acts first and
        // takes the free cell blocks the other from following it there.
        let params = ModelParams::with_origin_at(2, 1, 2, 0, 10, Position::new(0, 0)).unwrap();
        let free = Position::new(1, 0);
        let mut took_free_cell = 0;
        for seed in 0..100 {
            let mut m = CleaningModel::with_dirt(params.clone(), &[], StdRng::seed_from_u64(seed)).unwrap();
            m.step();
            let on_free = m.grid().occupants(free).len();
            assert!(on_free <= 1, "seed {}: {} vacuums on {}", seed, on_free, free);
            if on_free == 1 {
                took_free_cell += 1;
                assert_eq!(m.grid().occupants(Position::new(0, 0)).len(), 1);
            }
        }
        assert!(took_free_cell > 0);
    }

    #[test]
    fn test_more_vacuums_than_cells_runs_to_completion() {
        let mut m = model(3, 3, 10, 30, 20, 12);
        assert_eq!(m.dirty_cells(), 2);
        assert_eq!(m.grid().occupants(Position::new(1, 1)).len(), 10);
        while m.is_running() {
            let moves_before = m.population().total_moves();
            m.step();
            assert!(m.population().total_moves() >= moves_before);
            assert_eq!(m.current_metrics().clean_cells + m.dirty_cells(), 9);
            // Off the origin stack, no cell holds more than one vacuum.
            for (pos, count) in vacuum_counts(&m) {
                assert!(pos == Position::new(1, 1) || count == 1, "{} vacuums on {}", count, pos);
            }
        }
        let summary = m.run_to_completion();
        assert!(summary.ticks <= 20);
        assert_eq!(summary.clean_cells + m.dirty_cells(), 9);
        assert_eq!(m.population().vacuums().count(), 10);
    }

    #[test]
    fn test_same_seed_same_run() {
        let a = model(10, 10, 10, 30, 50, 77).run_to_completion();
        let b = model(10, 10, 10, 30, 50, 77).run_to_completion();
        assert_eq!(a, b);
    }

    #[test]
    fn test_with_dirt_rejects_bad_layouts() {
        let params = ModelParams::new(5, 5, 1, 0, 50).unwrap();
        let rng = || StdRng::seed_from_u64(0);
        assert!(CleaningModel::with_dirt(params.clone(), &[Position::new(1, 1)], rng()).is_err());
        assert!(CleaningModel::with_dirt(params.clone(), &[Position::new(5, 0)], rng()).is_err());
        assert!(CleaningModel::with_dirt(
            params.clone(),
            &[Position::new(2, 2), Position::new(2, 2)],
            rng()
        )
        .is_err());
        assert!(CleaningModel::with_dirt(params, &[Position::new(4, 4)], rng()).is_ok());
    }

    #[test]
    fn test_frame_reflects_live_agents() {
        let mut m = model(10, 10, 5, 10, 50, 4);
        assert_eq!(m.frame().agents.len(), 15);
        m.run_to_completion();
        let frame = m.frame();
        let vacuums = frame.agents.iter().filter(|a| a.kind == AgentKind::Vacuum).count();
        let dirt = frame.agents.iter().filter(|a| a.kind == AgentKind::Dirt).count();
        assert_eq!(vacuums, 5);
        assert_eq!(dirt as u32, m.dirty_cells());
        assert_eq!(frame.tick, m.ticks());
    }
}
