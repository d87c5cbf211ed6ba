use crate::damping::DampingProfile;
use crate::diagnostics::{self, EnergyScheme, EnergyTrace, InstabilityMonitor, InstabilityWarning};
use crate::error::{ConfigurationError, Result, SimulationError};
use crate::grid::Grid;
use crate::initial::InitialCondition;
use crate::operators::{BoundaryPolicy, SpatialOperator, Stencil};
use crate::source::{PointSource, SourceInjector};
use crate::wavefield::Wavefield;
use ndarray::{Array2, Zip};

/// Either an explicit time step or a CFL safety factor it is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeStep {
    Fixed(f64),
    /// `dt = safety * dx / (c * sqrt(2))`
    Cfl { safety: f64 },
}

impl TimeStep {
    pub fn resolve(&self, grid: &Grid, c: f64) -> Result<f64, ConfigurationError> {
        match *self {
            TimeStep::Fixed(dt) => {
                if !(dt > 0.0) {
                    return Err(ConfigurationError::NonPositiveTimeStep(dt));
                }
                Ok(dt)
            }
            TimeStep::Cfl { safety } => {
                if !(safety > 0.0) {
                    return Err(ConfigurationError::NonPositiveCflSafety(safety));
                }
                Ok(grid.dt_from_cfl(c, safety))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub nx: usize, // Cells in x
    pub ny: usize, // Cells in y
    pub lx: f64,   // Domain extent in x
    pub ly: f64,   // Domain extent in y
    pub c: f64,    // Wave speed
    pub time_step: TimeStep,
    pub steps: usize, // Total steps before the run is finalized; 0 for no limit

    pub boundary: BoundaryPolicy,
    pub boundary_width: usize, // Sponge thickness in cells
    pub gamma_max: f64,        // Damping at the outermost cells

    pub source: Option<PointSource>,
    pub initial: InitialCondition,

    pub energy_scheme: EnergyScheme,
    pub diagnostics: bool, // Recompute Bz, energy density and the trace every step
    pub instability_monitor: Option<InstabilityMonitor>,
}

impl Default for SimulationParams {
    /// Driven absorbing-boundary setup: 96x96 cells over 9.6 units with a 12-cell sponge.
    fn default() -> Self {
        Self {
            nx: 96,
            ny: 96,
            lx: 9.6,
            ly: 9.6,
            c: 1.0,
            time_step: TimeStep::Cfl { safety: 0.65 },
            steps: 800,
            boundary: BoundaryPolicy::Absorbing,
            boundary_width: 12,
            gamma_max: 2.5,
            source: Some(PointSource::new(48, 48, 1.5, 1.0)),
            initial: InitialCondition::gaussian(0.6, 2.5, 2.0),
            energy_scheme: EnergyScheme::Staggered,
            diagnostics: true,
            instability_monitor: None,
        }
    }
}

impl SimulationParams {
    /// Undamped periodic box with no source.
    pub fn periodic(nx: usize, ny: usize, lx: f64, ly: f64) -> Self {
        Self {
            nx,
            ny,
            lx,
            ly,
            boundary: BoundaryPolicy::Periodic,
            boundary_width: 0,
            gamma_max: 0.0,
            source: None,
            initial: InitialCondition::Zero,
            ..Self::default()
        }
    }

    pub fn total_time(&self, dt: f64) -> f64 {
        self.steps as f64 * dt
    }
}

/// `dt <= dx / (c sqrt 2)`; returns true if stable.
pub fn check_cfl(dt: f64, grid: &Grid, c: f64) -> bool {
    dt <= grid.cfl_limit(c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorState {
    /// Constructed, no step taken yet.
    Ready,
    Stepping,
    /// No further `advance()` calls are accepted.
    Finalized,
}

/// Owned copy of everything the rendering side may read after a step.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub step: usize,
    pub time: f64,
    pub ax: Array2<f64>,
    pub ay: Array2<f64>,
    pub bz: Array2<f64>,
    pub energy_density: Array2<f64>,
    pub total_energy: Vec<f64>,
    pub interior_energy: Vec<f64>,
}

/// Damped velocity-Verlet integrator for `∂²A/∂t² = c²∇²A + S − γ ∂A/∂t`.
///
/// Owns the field state; `advance()` is the only mutator.
pub struct Integrator {
    grid: Grid,
    operator: SpatialOperator,
    damping: DampingProfile,
    source: Option<SourceInjector>,
    field: Wavefield,
    c: f64,
    dt: f64,
    total_steps: usize,
    current_step: usize,
    state: IntegratorState,

    energy_scheme: EnergyScheme,
    diagnostics_enabled: bool,
    bz: Array2<f64>,
    energy_density: Array2<f64>,
    trace: EnergyTrace,
    monitor: Option<InstabilityMonitor>,

    // Per-step scratch buffers
    lap_x: Array2<f64>,
    lap_y: Array2<f64>,
    sx: Array2<f64>,
    sy: Array2<f64>,
}

impl Integrator {
    pub fn new(params: SimulationParams) -> Result<Self, ConfigurationError> {
        let grid = Grid::new(params.nx, params.ny, params.lx, params.ly)?;
        let (ax, ay) = params.initial.generate(&grid)?;
        let field = Wavefield::from_potential(ax, ay, grid.shape())?;
        Self::with_wavefield(params, field)
    }

    /// Starts from an explicit field state instead of `params.initial`.
    pub fn with_wavefield(params: SimulationParams, field: Wavefield) -> Result<Self, ConfigurationError> {
        let grid = Grid::new(params.nx, params.ny, params.lx, params.ly)?;
        let (nx, ny) = grid.shape();

        if !(params.c > 0.0) {
            return Err(ConfigurationError::NonPositiveWaveSpeed(params.c));
        }
        let dt = params.time_step.resolve(&grid, params.c)?;

        // nx, ny >= 2w + 1, written so that a huge w cannot overflow
        let w = params.boundary_width;
        if w > (nx.min(ny) - 1) / 2 {
            return Err(ConfigurationError::BoundaryTooWide { width: w, nx, ny });
        }
        if !(params.gamma_max >= 0.0) {
            return Err(ConfigurationError::NegativeDamping(params.gamma_max));
        }
        if let Some(src) = &params.source {
            if !grid.in_bounds(src.i, src.j) {
                return Err(ConfigurationError::SourceOutOfBounds {
                    i: src.i,
                    j: src.j,
                    nx,
                    ny,
                });
            }
        }
        for (name, array) in [
            ("ax", &field.ax),
            ("ay", &field.ay),
            ("vx", &field.vx),
            ("vy", &field.vy),
        ] {
            if array.dim() != (nx, ny) {
                return Err(ConfigurationError::ShapeMismatch {
                    name,
                    expected: (nx, ny),
                    actual: array.dim(),
                });
            }
        }

        if !check_cfl(dt, &grid, params.c) {
            // Not corrected: an unstable dt shows up as energy growth
            log::warn!(
                "CFL condition violated: dt={:.6e} exceeds the stable limit {:.6e}",
                dt,
                grid.cfl_limit(params.c)
            );
        }

        let damping = DampingProfile::build(nx, ny, w, params.gamma_max);
        let source = params
            .source
            .map(|src| SourceInjector::new(src, (nx, ny), dt));
        let operator = SpatialOperator::new(&grid, params.boundary);

        log::info!(
            "Integrator ready: {}x{} grid, dx={:.4}, dt={:.4e}, c={}, {:?} boundary (w={}, gamma_max={})",
            nx,
            ny,
            grid.dx,
            dt,
            params.c,
            params.boundary,
            w,
            params.gamma_max
        );

        let mut integrator = Self {
            operator,
            damping,
            source,
            field,
            c: params.c,
            dt,
            total_steps: params.steps,
            current_step: 0,
            state: IntegratorState::Ready,
            energy_scheme: params.energy_scheme,
            diagnostics_enabled: params.diagnostics,
            bz: grid.zeros(),
            energy_density: grid.zeros(),
            trace: EnergyTrace::new(),
            monitor: params.instability_monitor,
            lap_x: grid.zeros(),
            lap_y: grid.zeros(),
            sx: grid.zeros(),
            sy: grid.zeros(),
            grid,
        };
        // Initial-state diagnostics; nothing is appended to the trace until the first step
        integrator.bz = integrator.compute_bz();
        integrator.energy_density = integrator.compute_energy_density();
        Ok(integrator)
    }

    /// Advances the field by one time step.
    pub fn advance(&mut self) -> Result<()> {
        if self.state == IntegratorState::Finalized {
            return Err(SimulationError::Finalized {
                step: self.current_step,
            });
        }

        let dt = self.dt;
        let c2 = self.c * self.c;

        // 1. Forcing at the current step
        self.sx.fill(0.0);
        self.sy.fill(0.0);
        if let Some(source) = &self.source {
            source.add_to(self.current_step, &mut self.sx, &mut self.sy);
        }

        // 2-3. Semi-implicit damping, explicit propagation and forcing
        self.operator.laplacian_into(&self.field.ax, &mut self.lap_x);
        self.operator.laplacian_into(&self.field.ay, &mut self.lap_y);
        if self.damping.is_undamped() {
            // γ = 0 reduces the update to V += dt (c²∇²A + S)
            let update = |v: &mut f64, &l: &f64, &s: &f64| *v += dt * (c2 * l + s);
            Zip::from(&mut self.field.vx)
                .and(&self.lap_x)
                .and(&self.sx)
                .for_each(update);
            Zip::from(&mut self.field.vy)
                .and(&self.lap_y)
                .and(&self.sy)
                .for_each(update);
        } else {
            let gamma = self.damping.gamma();
            let update = |v: &mut f64, &g: &f64, &l: &f64, &s: &f64| {
                let half = 0.5 * g * dt;
                *v = ((1.0 - half) * *v + dt * (c2 * l + s)) / (1.0 + half);
            };
            Zip::from(&mut self.field.vx)
                .and(gamma)
                .and(&self.lap_x)
                .and(&self.sx)
                .for_each(update);
            Zip::from(&mut self.field.vy)
                .and(gamma)
                .and(&self.lap_y)
                .and(&self.sy)
                .for_each(update);
        }

        // 4. Positions from the new velocities
        Zip::from(&mut self.field.ax)
            .and(&self.field.vx)
            .for_each(|a, &v| *a += dt * v);
        Zip::from(&mut self.field.ay)
            .and(&self.field.vy)
            .for_each(|a, &v| *a += dt * v);

        // 5. Commit
        self.current_step += 1;
        self.state = if self.total_steps > 0 && self.current_step >= self.total_steps {
            IntegratorState::Finalized
        } else {
            IntegratorState::Stepping
        };

        // 6. Diagnostics
        if self.diagnostics_enabled {
            self.refresh_diagnostics();
        }

        Ok(())
    }

    /// Advances `n` steps, stopping at the first error.
    pub fn run(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.advance()?;
        }
        Ok(())
    }

    /// Advances until the configured step count is reached.
    pub fn run_to_end(&mut self) -> Result<()> {
        if self.total_steps == 0 {
            return Ok(());
        }
        while !self.is_finished() {
            self.advance()?;
        }
        Ok(())
    }

    /// Ends the run; later `advance()` calls fail.
    pub fn finalize(&mut self) {
        if self.state != IntegratorState::Finalized {
            log::debug!("Integrator finalized at step {}", self.current_step);
        }
        self.state = IntegratorState::Finalized;
    }

    fn refresh_diagnostics(&mut self) {
        self.bz = self.compute_bz();
        self.energy_density = self.compute_energy_density();
        let (total, interior) = diagnostics::integrate(
            &self.energy_density,
            self.damping.interior_mask(),
            self.grid.cell_area(),
        );
        self.trace.push(total, interior);
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.check(&self.trace, self.current_step);
        }
    }

    /// Bz of the committed potential.
    pub fn compute_bz(&self) -> Array2<f64> {
        self.operator.curl(&self.field.ax, &self.field.ay)
    }

    /// Energy density of the committed state under the configured [`EnergyScheme`].
    pub fn compute_energy_density(&self) -> Array2<f64> {
        let f = &self.field;
        match self.energy_scheme {
            EnergyScheme::Staggered => {
                let (hx, hy) = f.half_step_potential(self.dt);
                self.operator
                    .energy_density(&hx, &hy, &f.vx, &f.vy, self.c, Stencil::Forward)
            }
            EnergyScheme::Collocated => {
                self.operator
                    .energy_density(&f.ax, &f.ay, &f.vx, &f.vy, self.c, Stencil::Centred)
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step: self.current_step,
            time: self.current_time(),
            ax: self.field.ax.clone(),
            ay: self.field.ay.clone(),
            bz: self.bz.clone(),
            energy_density: self.energy_density.clone(),
            total_energy: self.trace.total().to_vec(),
            interior_energy: self.trace.interior().to_vec(),
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_step as f64 * self.dt
    }

    pub fn step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn is_finished(&self) -> bool {
        self.state == IntegratorState::Finalized
    }

    pub fn state(&self) -> IntegratorState {
        self.state
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn wave_speed(&self) -> f64 {
        self.c
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.operator.policy()
    }

    pub fn damping(&self) -> &DampingProfile {
        &self.damping
    }

    pub fn source(&self) -> Option<&SourceInjector> {
        self.source.as_ref()
    }

    pub fn wavefield(&self) -> &Wavefield {
        &self.field
    }

    pub fn ax(&self) -> &Array2<f64> {
        &self.field.ax
    }

    pub fn ay(&self) -> &Array2<f64> {
        &self.field.ay
    }

    pub fn vx(&self) -> &Array2<f64> {
        &self.field.vx
    }

    pub fn vy(&self) -> &Array2<f64> {
        &self.field.vy
    }

    /// Bz from the most recent diagnostic refresh.
    pub fn bz(&self) -> &Array2<f64> {
        &self.bz
    }

    /// Energy density from the most recent diagnostic refresh.
    pub fn energy_density(&self) -> &Array2<f64> {
        &self.energy_density
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics_enabled
    }

    pub fn energy_trace(&self) -> &EnergyTrace {
        &self.trace
    }

    pub fn instability_warnings(&self) -> &[InstabilityWarning] {
        match &self.monitor {
            Some(monitor) => monitor.warnings(),
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_params() -> SimulationParams {
        SimulationParams {
            nx: 32,
            ny: 32,
            lx: 3.2,
            ly: 3.2,
            steps: 20,
            boundary_width: 6,
            source: Some(PointSource::new(16, 16, 1.0, 2.0)),
            initial: InitialCondition::Zero,
            ..SimulationParams::default()
        }
    }

    #[test]
    fn test_state_machine() {
        let mut sim = Integrator::new(small_params()).unwrap();
        assert_eq!(sim.state(), IntegratorState::Ready);
        sim.advance().unwrap();
        assert_eq!(sim.state(), IntegratorState::Stepping);
        sim.run_to_end().unwrap();
        assert_eq!(sim.step(), 20);
        assert!(sim.is_finished());
        assert_eq!(sim.advance(), Err(SimulationError::Finalized { step: 20 }));
        assert_eq!(sim.energy_trace().len(), 20);
    }

    #[test]
    fn test_explicit_finalize() {
        let mut sim = Integrator::new(small_params()).unwrap();
        sim.run(3).unwrap();
        sim.finalize();
        assert!(sim.advance().is_err());
        assert_eq!(sim.step(), 3);
    }

    #[test]
    fn test_first_step_matches_hand_update() {
        let params = SimulationParams {
            source: Some(PointSource::new(16, 16, 1.0, 2.0)),
            ..small_params()
        };
        let mut sim = Integrator::new(params).unwrap();
        // sin(0) = 0, so step 0 does nothing to a quiescent field
        sim.advance().unwrap();
        assert!(sim.vx().iter().all(|&v| v == 0.0));

        // Step 1 injects dt * S at the source cell (no damping there, zero Laplacian)
        sim.advance().unwrap();
        let dt = sim.dt();
        let s = (2.0 * dt).sin();
        assert_relative_eq!(sim.vx()[[16, 16]], dt * s, epsilon = 1e-15);
        assert_relative_eq!(sim.ax()[[16, 16]], dt * dt * s, epsilon = 1e-15);
        assert!(sim.vy().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_undamped_update_is_plain_kick() {
        let params = SimulationParams {
            initial: InitialCondition::gaussian(0.4, 3.0, 3.0),
            source: None,
            ..SimulationParams::periodic(32, 32, 3.2, 3.2)
        };
        let mut sim = Integrator::new(params.clone()).unwrap();
        assert!(sim.damping().is_undamped());

        let (ax0, _) = params.initial.generate(sim.grid()).unwrap();
        let lap = SpatialOperator::new(sim.grid(), BoundaryPolicy::Periodic).laplacian(&ax0);
        let dt = sim.dt();
        sim.advance().unwrap();
        for (v, l) in sim.vx().iter().zip(lap.iter()) {
            assert_eq!(*v, dt * l);
        }
    }

    #[test]
    fn test_damping_update_form() {
        // Uniform field: Laplacian vanishes, so only damping acts on V
        let params = SimulationParams {
            nx: 21,
            ny: 21,
            lx: 2.1,
            ly: 2.1,
            boundary_width: 10,
            gamma_max: 3.0,
            source: None,
            ..small_params()
        };
        let mut field = Wavefield::new(21, 21);
        field.vx.fill(1.0);
        let mut sim = Integrator::with_wavefield(params, field).unwrap();
        let dt = sim.dt();
        sim.advance().unwrap();
        let g = 3.0;
        let expected = (1.0 - 0.5 * g * dt) / (1.0 + 0.5 * g * dt);
        assert_relative_eq!(sim.vx()[[0, 10]], expected, epsilon = 1e-14);
        // Centre is outside the sponge
        assert_relative_eq!(sim.vx()[[10, 10]], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_configuration_errors() {
        let too_wide = SimulationParams {
            boundary_width: 16,
            ..small_params()
        };
        assert_eq!(
            Integrator::new(too_wide).err(),
            Some(ConfigurationError::BoundaryTooWide {
                width: 16,
                nx: 32,
                ny: 32
            })
        );

        let huge = SimulationParams {
            boundary_width: usize::MAX / 2 + 1,
            ..small_params()
        };
        assert!(matches!(
            Integrator::new(huge).err(),
            Some(ConfigurationError::BoundaryTooWide { nx: 32, ny: 32, .. })
        ));

        let bad_speed = SimulationParams {
            c: 0.0,
            ..small_params()
        };
        assert_eq!(
            Integrator::new(bad_speed).err(),
            Some(ConfigurationError::NonPositiveWaveSpeed(0.0))
        );

        let bad_safety = SimulationParams {
            time_step: TimeStep::Cfl { safety: -0.5 },
            ..small_params()
        };
        assert_eq!(
            Integrator::new(bad_safety).err(),
            Some(ConfigurationError::NonPositiveCflSafety(-0.5))
        );

        let negative_damping = SimulationParams {
            gamma_max: -1.0,
            ..small_params()
        };
        assert_eq!(
            Integrator::new(negative_damping).err(),
            Some(ConfigurationError::NegativeDamping(-1.0))
        );

        let stray_impulse = SimulationParams {
            initial: InitialCondition::Impulse {
                i: 3,
                j: 32,
                amplitude: 1.0,
            },
            ..small_params()
        };
        assert_eq!(
            Integrator::new(stray_impulse).err(),
            Some(ConfigurationError::InitialOutOfBounds {
                i: 3,
                j: 32,
                nx: 32,
                ny: 32
            })
        );

        let bad_dt = SimulationParams {
            time_step: TimeStep::Fixed(0.0),
            ..small_params()
        };
        assert_eq!(
            Integrator::new(bad_dt).err(),
            Some(ConfigurationError::NonPositiveTimeStep(0.0))
        );

        let empty = SimulationParams {
            nx: 0,
            ..small_params()
        };
        assert!(matches!(
            Integrator::new(empty).err(),
            Some(ConfigurationError::EmptyGrid { .. })
        ));

        let outside = SimulationParams {
            source: Some(PointSource::new(40, 1, 1.0, 1.0)),
            ..small_params()
        };
        assert!(matches!(
            Integrator::new(outside).err(),
            Some(ConfigurationError::SourceOutOfBounds { i: 40, .. })
        ));

        let mismatched = Wavefield::new(8, 8);
        assert!(matches!(
            Integrator::with_wavefield(small_params(), mismatched).err(),
            Some(ConfigurationError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_diagnostics_toggle() {
        let params = SimulationParams {
            diagnostics: false,
            ..small_params()
        };
        let mut sim = Integrator::new(params).unwrap();
        sim.run(5).unwrap();
        assert!(sim.energy_trace().is_empty());
        // On-demand diagnostics still work
        assert_eq!(sim.compute_bz().dim(), (32, 32));
    }

    #[test]
    fn test_unstable_dt_trips_monitor() {
        let params = SimulationParams {
            time_step: TimeStep::Cfl { safety: 1.5 },
            steps: 0,
            boundary: BoundaryPolicy::Periodic,
            boundary_width: 0,
            gamma_max: 0.0,
            source: None,
            initial: InitialCondition::gaussian(0.3, 3.0, 3.0),
            instability_monitor: Some(InstabilityMonitor::new(10, 2.0)),
            ..small_params()
        };
        let mut sim = Integrator::new(params).unwrap();
        sim.run(200).unwrap();
        assert!(!sim.instability_warnings().is_empty());
        assert_eq!(sim.state(), IntegratorState::Stepping);
    }
}
