//! Frame loop: drives the integrator and hands snapshots to the visualiser.

use crate::config::Config;
use crate::integrator::Integrator;
use crate::visualisation::{write_trace_csv, FieldVisualiser};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps: usize,
    pub frames_written: usize,
    pub final_total_energy: Option<f64>,
    pub final_interior_energy: Option<f64>,
    pub instability_warnings: usize,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub write_frames: bool,
    pub report_period: usize,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: PathBuf::from(&config.visualisation.output_dir),
            write_frames: true,
            report_period: 100,
        }
    }
}

fn render_frame(sim: &Integrator, visualiser: &FieldVisualiser, field: &str) -> Result<()> {
    // Without per-step diagnostics the cached arrays are stale
    let computed;
    let data = match field {
        "bz" if !sim.diagnostics_enabled() => {
            computed = sim.compute_bz();
            &computed
        }
        "energy" if !sim.diagnostics_enabled() => {
            computed = sim.compute_energy_density();
            &computed
        }
        "bz" => sim.bz(),
        "energy" => sim.energy_density(),
        "ax" => sim.ax(),
        "ay" => sim.ay(),
        _ => return Err(anyhow!("Unknown field: {}", field)),
    };
    visualiser
        .plot_field(data, sim.step(), field, sim.current_time())
        .map_err(|e| anyhow!("Failed to render '{}' at step {}: {}", field, sim.step(), e))?;
    Ok(())
}

/// Runs a configured simulation to completion, writing frames and the energy trace.
pub fn run_simulation(config: &Config, options: &RunOptions) -> Result<RunSummary> {
    let params = config.to_params();
    let mut sim = Integrator::new(params.clone()).context("Invalid simulation parameters")?;
    let vis = &config.visualisation;
    let interval = vis.frame_interval.max(1);

    let visualiser = if options.write_frames || vis.write_trace {
        Some(
            FieldVisualiser::new(&options.output_dir, vis.image_width, vis.image_height)
                .with_context(|| {
                    format!("Failed to create output directory '{}'", options.output_dir.display())
                })?,
        )
    } else {
        None
    };

    println!("Starting simulation...");
    println!("Grid: {}x{}", sim.grid().nx, sim.grid().ny);
    println!("Wave speed: {}", sim.wave_speed());
    println!("Boundary: {:?}", sim.boundary());
    println!("Time step: {:.6}", sim.dt());
    println!("Total steps: {}", sim.total_steps());
    println!("Total time: {:.4}", params.total_time(sim.dt()));
    if let Some(source) = sim.source() {
        let p = source.point();
        println!("Source at ({}, {}) on {:?}", p.i, p.j, p.component);
    }

    let mut frames_written = 0;
    let frame_visualiser = visualiser.as_ref().filter(|_| options.write_frames);

    // Save initial state
    if let Some(v) = frame_visualiser {
        for field in &vis.fields {
            render_frame(&sim, v, field)?;
            frames_written += 1;
        }
    }

    let mut blown_up = false;
    while !sim.is_finished() {
        sim.advance()?;

        if !blown_up && !sim.wavefield().is_finite() {
            log::warn!("Field became non-finite at step {}", sim.step());
            blown_up = true;
        }

        if let Some(v) = frame_visualiser {
            if sim.step() % interval == 0 {
                for field in &vis.fields {
                    render_frame(&sim, v, field)?;
                    frames_written += 1;
                }
            }
        }

        if options.report_period > 0 && sim.step() % options.report_period == 0 {
            match sim.energy_trace().last() {
                Some((total, interior)) => println!(
                    "Step {}/{} (t={:.3}) energy={:.6e} interior={:.6e}",
                    sim.step(),
                    sim.total_steps(),
                    sim.current_time(),
                    total,
                    interior
                ),
                None => println!(
                    "Step {}/{} (t={:.3})",
                    sim.step(),
                    sim.total_steps(),
                    sim.current_time()
                ),
            }
        }
    }

    if vis.write_trace && !sim.energy_trace().is_empty() {
        if let Some(v) = &visualiser {
            write_outputs(&sim, v, v.output_dir())?;
        }
    }

    println!("Simulation complete!");
    if frames_written > 0 {
        println!(
            "{} frames saved to {} ({} fps suggested)",
            frames_written,
            options.output_dir.display(),
            vis.fps
        );
    }

    let last = sim.energy_trace().last();
    Ok(RunSummary {
        steps: sim.step(),
        frames_written,
        final_total_energy: last.map(|(total, _)| total),
        final_interior_energy: last.map(|(_, interior)| interior),
        instability_warnings: sim.instability_warnings().len(),
    })
}

fn write_outputs(sim: &Integrator, visualiser: &FieldVisualiser, dir: &Path) -> Result<()> {
    let csv_path = dir.join("energy_trace.csv");
    write_trace_csv(sim.energy_trace(), sim.dt(), &csv_path)
        .with_context(|| format!("Failed to write '{}'", csv_path.display()))?;
    visualiser
        .plot_energy_trace(sim.energy_trace())
        .map_err(|e| anyhow!("Failed to plot energy trace: {}", e))?;
    Ok(())
}
