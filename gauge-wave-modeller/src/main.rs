//! Command-line driver.
//!
//! ```sh
//! gauge-wave-modeller run configs/absorbing.toml
//! gauge-wave-modeller run configs/periodic.toml --no-frames
//! gauge-wave-modeller validate configs/absorbing.toml
//! ```
//! Frames can be assembled afterwards, e.g.
//! `ffmpeg -framerate 30 -pattern_type glob -i 'output/bz_*.png' -c:v libx264 -pix_fmt yuv420p bz.mp4`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gauge_wave_modeller::config::Config;
use gauge_wave_modeller::runner::{self, RunOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gauge-wave-modeller")]
#[command(about = "2D vector-potential wave simulation with sponge boundaries and energy diagnostics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML configuration file.
    Run {
        /// Path to the configuration file.
        config: PathBuf,
        /// Output directory (overrides the config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip PNG frames; only the energy trace is written.
        #[arg(long)]
        no_frames: bool,
        /// Print progress every N steps (0 disables).
        #[arg(long, default_value_t = 100)]
        report_period: usize,
    },
    /// Validate a configuration file without running it.
    Validate {
        /// Path to the configuration file.
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output,
            no_frames,
            report_period,
        } => {
            let cfg = Config::from_file(&config)?;
            cfg.print_summary();

            let mut options = RunOptions::from_config(&cfg);
            if let Some(dir) = output {
                options.output_dir = dir;
            }
            options.write_frames = !no_frames;
            options.report_period = report_period;

            let summary = runner::run_simulation(&cfg, &options)?;
            if let (Some(total), Some(interior)) =
                (summary.final_total_energy, summary.final_interior_energy)
            {
                println!(
                    "Final energy after {} steps: total={:.6e}, interior={:.6e}",
                    summary.steps, total, interior
                );
            }
            if summary.instability_warnings > 0 {
                println!(
                    "Warning: {} instability warning(s); check dt against the CFL bound",
                    summary.instability_warnings
                );
            }
            Ok(())
        }
        Commands::Validate { config } => {
            let cfg = Config::from_file(&config)?;
            cfg.print_summary();
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
    }
}
