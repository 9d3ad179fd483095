use anyhow::{Context, Result};
use cleaning_common::{BatchRow, Termination};
use plotters::prelude::*;
use std::fmt::Write as _;
use std::path::Path;

pub fn load_rows(path: &Path) -> Result<Vec<BatchRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open batch file: {}", path.display()))?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<BatchRow>, _>>()
        .with_context(|| format!("Failed to parse batch rows from {}", path.display()))?;
    Ok(rows)
}

/// Fixed-width table of the final metrics of every trial.
pub fn format_table(rows: &[BatchRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>9} {:>4} {:>6} {:>6} {:>15} {:>13} {:>13} {:>17} {:>11}",
        "iteration", "N", "dirt%", "tick", "remaining_dirt", "clean_cells", "dirty_cells", "agent_moves", "termination"
    );
    for row in rows {
        let termination = match row.termination {
            Termination::Cleaned => "cleaned",
            Termination::TimeLimit => "time_limit",
        };
        let _ = writeln!(
            out,
            "{:>9} {:>4} {:>6} {:>6} {:>15} {:>13} {:>13} {:>17} {:>11}",
            row.iteration,
            row.vacuums,
            row.dirt_percentage,
            row.tick,
            row.remaining_dirt,
            row.clean_cells,
            row.dirty_cells,
            row.agent_moves,
            termination
        );
    }
    out
}

/// Clean cells against iteration, one colored series per vacuum count.
pub fn draw_scatter(rows: &[BatchRow], output: &Path, width: u32, height: u32) -> Result<()> {
    let max_iteration = rows.iter().map(|r| r.iteration).max().unwrap_or(0);
    let max_clean = rows.iter().map(|r| r.clean_cells).max().unwrap_or(0);

    let mut vacuum_counts: Vec<u32> = rows.iter().map(|r| r.vacuums).collect();
    vacuum_counts.sort_unstable();
    vacuum_counts.dedup();

    let root = BitMapBackend::new(output, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Clean cells vs iterations", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0u32..max_iteration + 1, 0u32..max_clean + 1)?;

    chart
        .configure_mesh()
        .x_desc("Iterations")
        .y_desc("Clean cells")
        .draw()?;

    for (idx, vacuums) in vacuum_counts.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(
                rows.iter()
                    .filter(|r| r.vacuums == *vacuums)
                    .map(|r| Circle::new((r.iteration, r.clean_cells), 3, color.filled())),
            )?
            .label(format!("N = {}", vacuums))
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write plot to {}", output.display()))?;
    Ok(())
}
