use crate::diagnostics::EnergyTrace;
use ndarray::Array2;
use plotters::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How field values map onto the colour gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColourScale {
    /// `[-max|v|, max|v|]`, diverging gradient
    Symmetric,
    /// `[0, max v]`, sequential gradient
    Sequential,
}

impl ColourScale {
    pub fn for_field(field: &str) -> Self {
        match field {
            "energy" => ColourScale::Sequential,
            _ => ColourScale::Symmetric,
        }
    }
}

pub struct FieldVisualiser {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    diverging: Box<dyn colorgrad::Gradient>,
    sequential: Box<dyn colorgrad::Gradient>,
}

impl FieldVisualiser {
    pub fn new(output_dir: impl AsRef<Path>, width: u32, height: u32) -> std::io::Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            output_dir,
            width,
            height,
            diverging: Box::new(colorgrad::preset::rd_bu()),
            sequential: Box::new(colorgrad::preset::magma()),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn frame_path(&self, field_name: &str, step: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{:06}.png", field_name, step))
    }

    pub fn plot_field(
        &self,
        data: &Array2<f64>,
        step: usize,
        field_name: &str,
        time: f64,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = self.frame_path(field_name, step);
        {
            let root = BitMapBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE)?;

            let (nx, ny) = data.dim();
            let scale = ColourScale::for_field(field_name);
            let (min_val, max_val) = match scale {
                ColourScale::Symmetric => {
                    let max_abs = data.iter().map(|&v| v.abs()).fold(0.0_f64, f64::max);
                    (-max_abs, max_abs)
                }
                ColourScale::Sequential => (0.0, data.iter().copied().fold(0.0_f64, f64::max)),
            };

            let title = format!("{} at t={:.3} (step {})", field_name, time, step);
            let mut chart = ChartBuilder::on(&root)
                .caption(&title, ("sans-serif", 30))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(40)
                .build_cartesian_2d(0..nx, 0..ny)?;

            chart
                .configure_mesh()
                .x_desc("i (cells)")
                .y_desc("j (cells)")
                .disable_mesh()
                .draw()?;

            chart.draw_series(data.indexed_iter().map(|((i, j), &value)| {
                let color = self.value_to_color(value, min_val, max_val, scale);
                Rectangle::new([(i, j), (i + 1, j + 1)], color.filled())
            }))?;

            root.present()?;
        }
        log::debug!("Saved frame: {}", path.display());
        Ok(path)
    }

    /// Line plot of the total and interior energy against step number.
    pub fn plot_energy_trace(
        &self,
        trace: &EnergyTrace,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = self.output_dir.join("energy_trace.png");
        {
            let root = BitMapBackend::new(&path, (self.width, self.height / 2)).into_drawing_area();
            root.fill(&WHITE)?;

            let n = trace.len().max(2);
            let y_max = trace
                .total()
                .iter()
                .chain(trace.interior())
                .copied()
                .filter(|v| v.is_finite())
                .fold(0.0_f64, f64::max)
                .max(1e-12)
                * 1.05;

            let mut chart = ChartBuilder::on(&root)
                .caption("Energy", ("sans-serif", 24))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(1..n, 0.0..y_max)?;

            chart
                .configure_mesh()
                .x_desc("step")
                .y_desc("energy")
                .draw()?;

            chart
                .draw_series(LineSeries::new(
                    trace.total().iter().enumerate().map(|(k, &e)| (k + 1, e)),
                    &BLUE,
                ))?
                .label("total")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
            chart
                .draw_series(LineSeries::new(
                    trace.interior().iter().enumerate().map(|(k, &e)| (k + 1, e)),
                    &RED,
                ))?
                .label("interior (no sponge)")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;

            root.present()?;
        }
        Ok(path)
    }

    fn value_to_color(&self, value: f64, min_val: f64, max_val: f64, scale: ColourScale) -> RGBColor {
        let normalized = if max_val > min_val {
            (value - min_val) / (max_val - min_val)
        } else {
            0.5
        };
        let normalized = normalized.clamp(0.0, 1.0);
        let gradient = match scale {
            ColourScale::Symmetric => &self.diverging,
            ColourScale::Sequential => &self.sequential,
        };
        let color_rgba = gradient.at(normalized as f32).to_rgba8();
        RGBColor(color_rgba[0], color_rgba[1], color_rgba[2])
    }
}

/// Writes `step,time,total,interior` rows, one per trace entry.
pub fn write_trace_csv(trace: &EnergyTrace, dt: f64, path: &Path) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "step,time,total,interior")?;
    for (k, (total, interior)) in trace.total().iter().zip(trace.interior()).enumerate() {
        let step = k + 1;
        writeln!(out, "{},{:.6},{:.10e},{:.10e}", step, step as f64 * dt, total, interior)?;
    }
    out.flush()
}
