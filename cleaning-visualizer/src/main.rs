use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

mod decode;
mod metrics;
mod render;
mod report;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the batch results as a table
    Table {
        /// Batch CSV written by the engine
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Plot clean cells against iteration for every batch row
    Scatter {
        /// Batch CSV written by the engine
        #[arg(short, long)]
        input: PathBuf,

        /// Output image path (.png)
        #[arg(short, long, default_value = "clean_cells.png")]
        output: PathBuf,

        #[arg(long, default_value_t = 1024)]
        width: u32,

        #[arg(long, default_value_t = 768)]
        height: u32,
    },
    /// Chart remaining dirt, agent moves and clean vs dirty cells over ticks for one run
    Metrics {
        /// Metrics export written by the engine (.json, .bin or .msgpack)
        #[arg(short, long)]
        input: PathBuf,

        /// Output image path (.png)
        #[arg(short, long, default_value = "metrics.png")]
        output: PathBuf,

        #[arg(long, default_value_t = 900)]
        width: u32,

        #[arg(long, default_value_t = 1200)]
        height: u32,
    },
    /// Render every recorded grid frame to a PNG
    Frames {
        /// Frames export written by the engine (.json, .bin or .msgpack)
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for the rendered frames
        #[arg(short, long, default_value = "frames")]
        output_dir: PathBuf,

        /// Size of the longer image side in pixels
        #[arg(long, default_value_t = 600)]
        size: u32,

        /// Background color - name of the color for the background
        #[arg(long, default_value = "white")]
        bg_color: String,
    },
}

// Color definitions for named colors (RGBA format)
const COLOR_MAP: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
];

/// Parse a color name to RGBA values
fn parse_color(color_name: &str) -> [u8; 4] {
    for &(name, color) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color_name) {
            return color;
        }
    }
    // Default to white if color not found
    warn!("Color '{}' not recognized, using white.", color_name);
    [255, 255, 255, 255]
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    let _ = Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .try_init();

    info!("Starting Cleaning Visualizer...");

    match args.command {
        Command::Table { input } => {
            let rows = report::load_rows(&input)?;
            info!("Loaded {} batch rows from {}", rows.len(), input.display());
            print!("{}", report::format_table(&rows));
        }
        Command::Scatter { input, output, width, height } => {
            let rows = report::load_rows(&input)?;
            if rows.is_empty() {
                warn!("Input file contains no rows. Exiting.");
                return Ok(());
            }
            report::draw_scatter(&rows, &output, width, height)?;
            info!("Scatter plot saved to {}", output.display());
        }
        Command::Metrics { input, output, width, height } => {
            let run = metrics::RunMetrics::load(&input)?;
            print!("{}", metrics::format_summary(&run));
            if run.metrics.is_empty() {
                warn!("Input file contains no metrics records. Exiting.");
                return Ok(());
            }
            metrics::draw_metrics(&run, &output, width, height)?;
            info!("Metrics charts saved to {}", output.display());
        }
        Command::Frames { input, output_dir, size, bg_color } => {
            render_frames(&input, &output_dir, size, parse_color(&bg_color))?;
        }
    }
    Ok(())
}

fn render_frames(input: &Path, output_dir: &Path, size: u32, bg_color: [u8; 4]) -> Result<()> {
    let frames = render::load_frames(input)?;
    info!("Found {} frames in {}", frames.len(), input.display());
    if frames.is_empty() {
        warn!("Input file contains no frames. Exiting.");
        return Ok(());
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    // Set up progress bar
    let progress_bar = ProgressBar::new(frames.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    frames.par_iter().enumerate().try_for_each(|(index, frame)| -> Result<()> {
        let image = render::draw_frame(frame, size, bg_color);
        let path = output_dir.join(format!("frame_{:05}.png", index));
        image
            .save(&path)
            .with_context(|| format!("Failed to write frame {}", path.display()))?;
        progress_bar.inc(1);
        Ok(())
    })?;
    progress_bar.finish_with_message("done");

    let duration = start_time.elapsed();
    info!(
        "Rendered {} frames in {:.2?} ({:.1} frames per second)",
        frames.len(),
        duration,
        frames.len() as f64 / duration.as_secs_f64().max(1e-9)
    );
    info!("Output saved to: {}", output_dir.display());
    Ok(())
}
