use crate::diagnostics::{EnergyScheme, InstabilityMonitor};
use crate::grid::Grid;
use crate::initial::InitialCondition;
use crate::integrator::{SimulationParams, TimeStep};
use crate::operators::BoundaryPolicy;
use crate::source::{Component, PointSource};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    pub lx: f64,
    pub ly: f64,
}

impl GridConfig {
    fn validate(&self) -> Result<()> {
        if self.nx == 0 || self.ny == 0 {
            return Err(anyhow!("Grid dimensions must be positive (nx={}, ny={})", self.nx, self.ny));
        }
        if self.lx <= 0.0 || self.ly <= 0.0 {
            return Err(anyhow!(
                "Grid extents must be positive (lx={}, ly={})",
                self.lx,
                self.ly
            ));
        }
        Ok(())
    }

    pub fn dx(&self) -> f64 {
        self.lx / self.nx as f64
    }
}

/// Medium configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveConfig {
    #[serde(default = "default_wave_speed")]
    pub c: f64,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            c: default_wave_speed(),
        }
    }
}

fn default_wave_speed() -> f64 {
    1.0
}

/// Time stepping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt: Option<f64>, // Optional: derived from the CFL safety factor if absent
    #[serde(default = "default_cfl_safety")]
    pub cfl_safety: f64,
    pub steps: usize,
}

fn default_cfl_safety() -> f64 {
    0.65
}

impl TimeConfig {
    fn validate(&self) -> Result<()> {
        if let Some(dt) = self.dt {
            if dt <= 0.0 {
                return Err(anyhow!("dt must be positive, got {}", dt));
            }
        }
        if self.cfl_safety <= 0.0 {
            return Err(anyhow!("cfl_safety must be positive, got {}", self.cfl_safety));
        }
        if self.steps == 0 {
            return Err(anyhow!("steps must be at least 1"));
        }
        Ok(())
    }

    pub fn time_step(&self) -> TimeStep {
        match self.dt {
            Some(dt) => TimeStep::Fixed(dt),
            None => TimeStep::Cfl {
                safety: self.cfl_safety,
            },
        }
    }

    pub fn resolved_dt(&self, dx: f64, c: f64) -> f64 {
        match self.time_step() {
            TimeStep::Fixed(dt) => dt,
            TimeStep::Cfl { safety } => safety * Grid::cfl_limit_for_spacing(dx, c),
        }
    }
}

/// Sponge layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    #[serde(default)]
    pub policy: BoundaryPolicy,
    #[serde(default = "default_boundary_width")]
    pub width: usize,
    #[serde(default = "default_gamma_max")]
    pub gamma_max: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            policy: BoundaryPolicy::default(),
            width: default_boundary_width(),
            gamma_max: default_gamma_max(),
        }
    }
}

fn default_boundary_width() -> usize {
    12
}

fn default_gamma_max() -> f64 {
    2.5
}

impl BoundaryConfig {
    fn validate(&self, nx: usize, ny: usize) -> Result<()> {
        if self.width > nx.min(ny).saturating_sub(1) / 2 {
            return Err(anyhow!(
                "Boundary width {} is too large for a {}x{} grid",
                self.width,
                nx,
                ny
            ));
        }
        if self.gamma_max < 0.0 {
            return Err(anyhow!("gamma_max must be non-negative, got {}", self.gamma_max));
        }
        Ok(())
    }
}

/// Point source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub i: Option<usize>, // Default: grid centre
    pub j: Option<usize>,
    pub amplitude: f64,
    pub omega: f64,
    #[serde(default)]
    pub component: Component,
}

impl SourceConfig {
    fn position(&self, nx: usize, ny: usize) -> (usize, usize) {
        (self.i.unwrap_or(nx / 2), self.j.unwrap_or(ny / 2))
    }

    fn validate(&self, nx: usize, ny: usize) -> Result<()> {
        let (i, j) = self.position(nx, ny);
        if i >= nx || j >= ny {
            return Err(anyhow!(
                "Source position ({}, {}) is outside grid bounds ({}, {})",
                i,
                j,
                nx,
                ny
            ));
        }
        if self.omega < 0.0 {
            return Err(anyhow!("Source omega must be non-negative, got {}", self.omega));
        }
        Ok(())
    }

    pub fn to_point_source(&self, nx: usize, ny: usize) -> PointSource {
        let (i, j) = self.position(nx, ny);
        PointSource::new(i, j, self.amplitude, self.omega).on_component(self.component)
    }
}

/// Diagnostics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub energy_scheme: EnergyScheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instability_window: Option<usize>,
    #[serde(default = "default_instability_growth")]
    pub instability_growth: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_scheme: EnergyScheme::default(),
            instability_window: None,
            instability_growth: default_instability_growth(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_instability_growth() -> f64 {
    10.0
}

/// Visualisation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualisationConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default = "default_frame_interval")]
    pub frame_interval: usize,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    #[serde(default = "default_true")]
    pub write_trace: bool,
}

impl Default for VisualisationConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            fields: default_fields(),
            frame_interval: default_frame_interval(),
            fps: default_fps(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            write_trace: true,
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_fields() -> Vec<String> {
    vec!["bz".to_string(), "energy".to_string()]
}

fn default_frame_interval() -> usize {
    1
}

fn default_fps() -> f64 {
    30.0
}

fn default_image_width() -> u32 {
    1200
}

fn default_image_height() -> u32 {
    1000
}

pub const VALID_FIELDS: [&str; 4] = ["bz", "energy", "ax", "ay"];

impl VisualisationConfig {
    fn validate(&self) -> Result<()> {
        for field in &self.fields {
            if !VALID_FIELDS.contains(&field.as_str()) {
                return Err(anyhow!(
                    "Invalid field '{}'. Must be one of: {:?}",
                    field,
                    VALID_FIELDS
                ));
            }
        }
        if self.frame_interval == 0 {
            return Err(anyhow!("frame_interval must be at least 1"));
        }
        if self.fps <= 0.0 {
            return Err(anyhow!("fps must be positive, got {}", self.fps));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(anyhow!(
                "Image dimensions must be positive (width={}, height={})",
                self.image_width,
                self.image_height
            ));
        }
        Ok(())
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    #[serde(default)]
    pub wave: WaveConfig,
    pub time: TimeConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,
    #[serde(default)]
    pub initial: InitialCondition,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub visualisation: VisualisationConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;

        // Validate before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        if self.wave.c <= 0.0 {
            return Err(anyhow!("Wave speed must be positive, got {}", self.wave.c));
        }
        self.time.validate()?;
        self.boundary.validate(self.grid.nx, self.grid.ny)?;
        if let Some(source) = &self.source {
            source.validate(self.grid.nx, self.grid.ny)?;
        }
        if let InitialCondition::Impulse { i, j, .. } = self.initial {
            if i >= self.grid.nx || j >= self.grid.ny {
                return Err(anyhow!(
                    "Initial impulse ({}, {}) is outside grid bounds ({}, {})",
                    i,
                    j,
                    self.grid.nx,
                    self.grid.ny
                ));
            }
        }
        self.visualisation.validate()?;

        Ok(())
    }

    pub fn to_params(&self) -> SimulationParams {
        let (nx, ny) = (self.grid.nx, self.grid.ny);
        SimulationParams {
            nx,
            ny,
            lx: self.grid.lx,
            ly: self.grid.ly,
            c: self.wave.c,
            time_step: self.time.time_step(),
            steps: self.time.steps,
            boundary: self.boundary.policy,
            boundary_width: self.boundary.width,
            gamma_max: self.boundary.gamma_max,
            source: self.source.as_ref().map(|s| s.to_point_source(nx, ny)),
            initial: self.initial.clone(),
            energy_scheme: self.diagnostics.energy_scheme,
            diagnostics: self.diagnostics.enabled,
            instability_monitor: self
                .diagnostics
                .instability_window
                .map(|window| InstabilityMonitor::new(window, self.diagnostics.instability_growth)),
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let dt = self.time.resolved_dt(self.grid.dx(), self.wave.c);
        println!("=== Simulation Configuration ===");
        println!(
            "Grid: {}x{} ({} x {}), dx={}",
            self.grid.nx,
            self.grid.ny,
            self.grid.lx,
            self.grid.ly,
            self.grid.dx()
        );
        println!("Wave speed: c={}", self.wave.c);
        println!(
            "Time: dt={:.6}, steps={}, total_time={:.4}",
            dt,
            self.time.steps,
            dt * self.time.steps as f64
        );
        println!(
            "Boundary: {:?} (width={}, gamma_max={})",
            self.boundary.policy, self.boundary.width, self.boundary.gamma_max
        );
        match &self.source {
            Some(src) => {
                let (i, j) = src.position(self.grid.nx, self.grid.ny);
                println!(
                    "Source: ({}, {}) on {:?}, amplitude={}, omega={}",
                    i, j, src.component, src.amplitude, src.omega
                );
            }
            None => println!("Source: none"),
        }
        println!("Initial condition: {:?}", self.initial);
        println!(
            "Diagnostics: {} ({:?} energy)",
            if self.diagnostics.enabled { "on" } else { "off" },
            self.diagnostics.energy_scheme
        );
        println!(
            "Visualisation: {:?} every {} steps at {}x{} into '{}'",
            self.visualisation.fields,
            self.visualisation.frame_interval,
            self.visualisation.image_width,
            self.visualisation.image_height,
            self.visualisation.output_dir
        );
        println!("================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ABSORBING: &str = r#"
        [grid]
        nx = 96
        ny = 96
        lx = 9.6
        ly = 9.6

        [time]
        steps = 800

        [source]
        amplitude = 1.5
        omega = 1.0

        [initial]
        kind = "gaussian"
        sigma = 0.6
        kx = 2.5
        ky = 2.0
    "#;

    #[test]
    fn test_defaults_fill_in() {
        let config = Config::from_toml(ABSORBING).unwrap();
        assert_eq!(config.boundary.policy, BoundaryPolicy::Absorbing);
        assert_eq!(config.boundary.width, 12);
        assert_relative_eq!(config.boundary.gamma_max, 2.5);
        assert_relative_eq!(config.time.cfl_safety, 0.65);
        assert_eq!(config.visualisation.fields, vec!["bz", "energy"]);
        assert!(config.diagnostics.enabled);
        assert_eq!(config.diagnostics.energy_scheme, EnergyScheme::Staggered);

        let params = config.to_params();
        let source = params.source.unwrap();
        assert_eq!((source.i, source.j), (48, 48));
        assert_eq!(source.component, Component::Ax);
        assert_eq!(params.initial, InitialCondition::gaussian(0.6, 2.5, 2.0));
        assert_eq!(params.time_step, TimeStep::Cfl { safety: 0.65 });
    }

    #[test]
    fn test_periodic_without_source() {
        let config = Config::from_toml(
            r#"
            [grid]
            nx = 64
            ny = 64
            lx = 6.4
            ly = 6.4

            [time]
            dt = 0.01
            steps = 150

            [boundary]
            policy = "periodic"
            width = 0
            gamma_max = 0.0

            [diagnostics]
            energy_scheme = "collocated"
            instability_window = 20
        "#,
        )
        .unwrap();
        let params = config.to_params();
        assert_eq!(params.boundary, BoundaryPolicy::Periodic);
        assert!(params.source.is_none());
        assert_eq!(params.initial, InitialCondition::Zero);
        assert_eq!(params.time_step, TimeStep::Fixed(0.01));
        assert_eq!(params.energy_scheme, EnergyScheme::Collocated);
        assert_eq!(params.instability_monitor.unwrap().window, 20);
    }

    #[test]
    fn test_rejects_wide_boundary() {
        let err = Config::from_toml(
            r#"
            [grid]
            nx = 20
            ny = 20
            lx = 2.0
            ly = 2.0

            [time]
            steps = 10

            [boundary]
            width = 10
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_huge_boundary_width_rejected() {
        let boundary = BoundaryConfig {
            width: usize::MAX / 2 + 1,
            ..BoundaryConfig::default()
        };
        assert!(boundary.validate(32, 32).is_err());
        assert!(BoundaryConfig::default().validate(25, 25).is_ok());
    }

    #[test]
    fn test_resolved_dt_matches_integrator() {
        let config = Config::from_toml(ABSORBING).unwrap();
        let sim = crate::integrator::Integrator::new(config.to_params()).unwrap();
        assert_eq!(config.time.resolved_dt(config.grid.dx(), config.wave.c), sim.dt());
    }

    #[test]
    fn test_rejects_impulse_outside_grid() {
        let toml = ABSORBING.replace(
            "kind = \"gaussian\"",
            "kind = \"impulse\"\n        i = 96\n        j = 10\n        amplitude = 1.0",
        );
        let toml = toml.replace("sigma = 0.6", "").replace("kx = 2.5", "").replace("ky = 2.0", "");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("outside grid bounds"));
    }

    #[test]
    fn test_rejects_unknown_field() {
        let toml = format!("{}\n[visualisation]\nfields = [\"vmag\"]\n", ABSORBING);
        assert!(Config::from_toml(&toml).is_err());
    }
}
