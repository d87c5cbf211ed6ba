//! Error types for integrator construction and stepping.

use thiserror::Error;

/// Invalid parameters detected while building an integrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Grid dimensions must be positive (nx={nx}, ny={ny})")]
    EmptyGrid { nx: usize, ny: usize },

    #[error("Grid extents must be positive (lx={lx}, ly={ly})")]
    NonPositiveExtent { lx: f64, ly: f64 },

    #[error("Wave speed must be positive, got {0}")]
    NonPositiveWaveSpeed(f64),

    #[error("Time step must be positive, got {0}")]
    NonPositiveTimeStep(f64),

    #[error("CFL safety factor must be positive, got {0}")]
    NonPositiveCflSafety(f64),

    #[error(
        "Boundary width {width} is too large for a {nx}x{ny} grid (need nx, ny >= 2*width + 1)"
    )]
    BoundaryTooWide { width: usize, nx: usize, ny: usize },

    #[error("gamma_max must be non-negative, got {0}")]
    NegativeDamping(f64),

    #[error("Source cell ({i}, {j}) is outside grid bounds ({nx}, {ny})")]
    SourceOutOfBounds {
        i: usize,
        j: usize,
        nx: usize,
        ny: usize,
    },

    #[error("Initial impulse cell ({i}, {j}) is outside grid bounds ({nx}, {ny})")]
    InitialOutOfBounds {
        i: usize,
        j: usize,
        nx: usize,
        ny: usize,
    },

    #[error("Field '{name}' has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

/// Errors returned while driving a constructed integrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("advance() called on a finalized integrator (step {step})")]
    Finalized { step: usize },
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
