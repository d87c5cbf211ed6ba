//! Explicit time-domain integrator for a two-component vector potential
//! `(Ax, Ay)` obeying the damped, driven wave equation
//!
//! ```text
//! ∂²A/∂t² = c² ∇²A + S − γ ∂A/∂t
//! ```
//!
//! on a 2D grid with periodic or sponge-absorbing boundaries. Each step
//! exposes the field, the scalar curl `Bz = ∂x Ay − ∂y Ax`, the energy density
//! and the integrated energy trace.
//!
//! ```no_run
//! use gauge_wave_modeller::{InitialCondition, Integrator, SimulationParams};
//!
//! let params = SimulationParams {
//!     initial: InitialCondition::gaussian(0.6, 3.0, 3.0),
//!     steps: 150,
//!     ..SimulationParams::periodic(64, 64, 6.4, 6.4)
//! };
//! let mut sim = Integrator::new(params)?;
//! sim.run_to_end()?;
//! println!("{:?}", sim.energy_trace().relative_drift());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod damping;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod initial;
pub mod integrator;
pub mod operators;
pub mod runner;
pub mod source;
pub mod visualisation;
pub mod wavefield;

pub use damping::DampingProfile;
pub use diagnostics::{EnergyScheme, EnergyTrace, InstabilityMonitor, InstabilityWarning};
pub use error::{ConfigurationError, SimulationError};
pub use grid::Grid;
pub use initial::InitialCondition;
pub use integrator::{Integrator, IntegratorState, SimulationParams, Snapshot, TimeStep};
pub use operators::{BoundaryPolicy, SpatialOperator, Stencil};
pub use source::{Component, PointSource, SourceInjector};
pub use wavefield::Wavefield;
