use anyhow::{Context, Result};
use cleaning_common::{MetricsRecord, ModelParams, RunSummary, Termination};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// A single-run metrics export as written by the engine's `run` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub params: ModelParams,
    pub summary: RunSummary,
    pub metrics: Vec<MetricsRecord>,
}

type Series<'a> = (&'a str, RGBColor, Vec<(u32, u64)>);

impl RunMetrics {
    pub fn load(path: &Path) -> Result<Self> {
        crate::decode::load_export(path)
    }

    /// One record per tick. The final record shares its tick with the record
    /// taken at the start of that tick and replaces it.
    pub fn per_tick(&self) -> Vec<MetricsRecord> {
        let mut out: Vec<MetricsRecord> = Vec::with_capacity(self.metrics.len());
        for record in &self.metrics {
            if out.last().is_some_and(|last| last.tick == record.tick) {
                out.pop();
            }
            out.push(*record);
        }
        out
    }
}

pub fn format_summary(run: &RunMetrics) -> String {
    let summary = &run.summary;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}x{} grid, {} vacuums, {}% dirt ({} cells)",
        run.params.width, run.params.height, run.params.vacuums, run.params.dirt_percentage, run.params.dirty_cells
    );
    let _ = match summary.termination {
        Termination::Cleaned => writeln!(out, "TIME NEEDED: {} ticks", summary.ticks),
        Termination::TimeLimit => writeln!(out, "TIME LIMIT: {} ticks", summary.ticks),
    };
    let _ = writeln!(out, "CLEAN CELLS: {}", summary.clean_cells);
    let _ = writeln!(out, "PERCENTAGE CLEAN CELLS: {:.2}%", summary.percent_clean);
    let _ = writeln!(out, "AGENT MOVES: {}", summary.agent_moves);
    out
}

/// Three stacked charts over ticks: remaining dirt, agent moves, clean vs dirty cells.
pub fn draw_metrics(run: &RunMetrics, output: &Path, width: u32, height: u32) -> Result<()> {
    let records = run.per_tick();
    let max_tick = records.last().map(|r| r.tick).unwrap_or(0);

    let root = BitMapBackend::new(output, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((3, 1));

    draw_panel(
        &panels[0],
        "Remaining dirt",
        max_tick,
        &[("Remaining dirt", RED, points(&records, |r| r.remaining_dirt as u64))],
    )?;
    draw_panel(
        &panels[1],
        "Agent moves",
        max_tick,
        &[("Agent moves", BLUE, points(&records, |r| r.agent_moves))],
    )?;
    draw_panel(
        &panels[2],
        "Clean vs dirty cells",
        max_tick,
        &[
            ("Clean cells", GREEN, points(&records, |r| r.clean_cells as u64)),
            ("Dirty cells", RED, points(&records, |r| r.dirty_cells as u64)),
        ],
    )?;

    root.present()
        .with_context(|| format!("Failed to write plot to {}", output.display()))?;
    Ok(())
}

fn points(records: &[MetricsRecord], value: fn(&MetricsRecord) -> u64) -> Vec<(u32, u64)> {
    records.iter().map(|r| (r.tick, value(r))).collect()
}

fn draw_panel(area: &DrawingArea<BitMapBackend<'_>, Shift>, caption: &str, max_tick: u32, series: &[Series<'_>]) -> Result<()> {
    let max_y = series
        .iter()
        .flat_map(|(_, _, points)| points.iter().map(|&(_, y)| y))
        .max()
        .unwrap_or(0);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(0u32..max_tick + 1, 0u64..max_y + 1)?;

    chart.configure_mesh().x_desc("Tick").draw()?;

    for (name, color, points) in series {
        let color = *color;
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(*name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}
