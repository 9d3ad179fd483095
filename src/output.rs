use anyhow::{Context, Result};
use cleaning_common::{BatchRow, GridFrame, MetricsRecord, ModelParams, OutputFormat, RunSummary};
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Everything a single run leaves behind; the visualizer's `metrics` command charts it.
#[derive(Debug, Serialize)]
pub struct RunExport<'a> {
    pub params: &'a ModelParams,
    pub summary: &'a RunSummary,
    pub metrics: &'a [MetricsRecord],
}

/// `<base>_<name>.<ext>` for the given format.
pub fn export_path(base_filename: &str, name: &str, format: OutputFormat) -> PathBuf {
    PathBuf::from(format!("{}_{}.{}", base_filename, name, format.extension()))
}

/// Serializes `value` to `path` in the requested format.
pub fn write_export<T: Serialize + ?Sized>(path: &Path, format: OutputFormat, value: &T) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create export file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        // Regular JSON output
        OutputFormat::Json => serde_json::to_writer(&mut writer, value)
            .with_context(|| format!("Failed to serialize JSON to '{}'", path.display()))?,
        // Binary format (much more compact)
        OutputFormat::Bincode => bincode::serialize_into(&mut writer, value)
            .with_context(|| format!("Failed to serialize bincode to '{}'", path.display()))?,
        // MessagePack format (compact and cross-platform)
        OutputFormat::Messagepack => rmp_serde::encode::write(&mut writer, value)
            .with_context(|| format!("Failed to serialize MessagePack to '{}'", path.display()))?,
    }
    writer.flush()?;
    info!("Saved {}", path.display());
    Ok(())
}

pub fn write_run(path: &Path, format: OutputFormat, export: &RunExport<'_>) -> Result<()> {
    write_export(path, format, export)
}

pub fn write_frames(path: &Path, format: OutputFormat, frames: &[GridFrame]) -> Result<()> {
    write_export(path, format, frames)
}

/// Batch rows as CSV, one header line then one line per trial.
pub fn write_batch_csv(path: &Path, rows: &[BatchRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file '{}'", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Batch results ({} rows) saved to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleaning_common::Termination;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cleaning_sim_{}_{}", std::process::id(), name))
    }

    fn sample_rows() -> Vec<BatchRow> {
        vec![
            BatchRow {
                iteration: 0,
                vacuums: 5,
                dirt_percentage: 10,
                tick: 23,
                remaining_dirt: 0,
                clean_cells: 100,
                dirty_cells: 0,
                agent_moves: 81,
                termination: Termination::Cleaned,
            },
            BatchRow {
                iteration: 1,
                vacuums: 5,
                dirt_percentage: 10,
                tick: 50,
                remaining_dirt: 2,
                clean_cells: 98,
                dirty_cells: 2,
                agent_moves: 190,
                termination: Termination::TimeLimit,
            },
        ]
    }

    #[test]
    fn test_export_path() {
        let path = export_path("out/cleaning", "metrics", OutputFormat::Messagepack);
        assert_eq!(path, PathBuf::from("out/cleaning_metrics.msgpack"));
        let path = export_path("cleaning", "frames", OutputFormat::Bincode);
        assert_eq!(path, PathBuf::from("cleaning_frames.bin"));
    }

    #[test]
    fn test_batch_csv_has_header_and_rows() {
        let path = temp_path("batch.csv");
        write_batch_csv(&path, &sample_rows()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "iteration,vacuums,dirt_percentage,tick,remaining_dirt,clean_cells,dirty_cells,agent_moves,termination"
        );
        assert_eq!(lines.next().unwrap(), "0,5,10,23,0,100,0,81,cleaned");
        assert_eq!(lines.next().unwrap(), "1,5,10,50,2,98,2,190,time_limit");
        assert!(lines.next().is_none());

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<BatchRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, sample_rows());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_json_run_export() {
        let params = ModelParams::new(10, 10, 5, 10, 50).unwrap();
        let summary = RunSummary {
            termination: Termination::TimeLimit,
            ticks: 50,
            clean_cells: 97,
            percent_clean: 97.0,
            agent_moves: 200,
        };
        let metrics = vec![MetricsRecord {
            tick: 1,
            remaining_dirt: 10,
            clean_cells: 90,
            dirty_cells: 10,
            agent_moves: 0,
        }];
        let path = temp_path("metrics.json");
        write_run(&path, OutputFormat::Json, &RunExport { params: &params, summary: &summary, metrics: &metrics }).unwrap();

        let value: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["termination"], "time_limit");
        assert_eq!(value["summary"]["ticks"], 50);
        assert_eq!(value["metrics"][0]["remaining_dirt"], 10);
        assert_eq!(value["params"]["dirty_cells"], 10);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_binary_frame_exports() {
        let frames = vec![GridFrame { tick: 1, width: 3, height: 3, agents: Vec::new() }];

        let path = temp_path("frames.bin");
        write_frames(&path, OutputFormat::Bincode, &frames).unwrap();
        let decoded: Vec<GridFrame> = bincode::deserialize_from(File::open(&path).unwrap()).unwrap();
        assert_eq!(decoded, frames);
        std::fs::remove_file(&path).ok();

        let path = temp_path("frames.msgpack");
        write_frames(&path, OutputFormat::Messagepack, &frames).unwrap();
        let decoded: Vec<GridFrame> = rmp_serde::from_read(File::open(&path).unwrap()).unwrap();
        assert_eq!(decoded, frames);
        std::fs::remove_file(&path).ok();
    }
}
