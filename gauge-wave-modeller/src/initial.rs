//! Initial excitations for the potential. The velocity always starts at rest.

use crate::error::ConfigurationError;
use crate::grid::Grid;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InitialCondition {
    /// Quiescent field, typically paired with a driving source.
    #[default]
    Zero,
    /// `Ax = g cos(kx x)`, `Ay = g sin(ky y)` with `g = exp(-r² / 2σ²)`.
    Gaussian { sigma: f64, kx: f64, ky: f64 },
    /// Both components set to `amplitude` at a single cell.
    Impulse { i: usize, j: usize, amplitude: f64 },
}

impl InitialCondition {
    pub fn gaussian(sigma: f64, kx: f64, ky: f64) -> Self {
        InitialCondition::Gaussian { sigma, kx, ky }
    }

    /// Samples `(Ax, Ay)` on the grid. An impulse outside the grid is rejected.
    pub fn generate(&self, grid: &Grid) -> Result<(Array2<f64>, Array2<f64>), ConfigurationError> {
        let fields = match *self {
            InitialCondition::Zero => (grid.zeros(), grid.zeros()),
            InitialCondition::Gaussian { sigma, kx, ky } => {
                let two_sigma2 = 2.0 * sigma * sigma;
                let envelope = |x: f64, y: f64| (-(x * x + y * y) / two_sigma2).exp();
                let ax = grid.sample(|x, y| envelope(x, y) * (kx * x).cos());
                let ay = grid.sample(|x, y| envelope(x, y) * (ky * y).sin());
                (ax, ay)
            }
            InitialCondition::Impulse { i, j, amplitude } => {
                if !grid.in_bounds(i, j) {
                    return Err(ConfigurationError::InitialOutOfBounds {
                        i,
                        j,
                        nx: grid.nx,
                        ny: grid.ny,
                    });
                }
                let mut ax = grid.zeros();
                let mut ay = grid.zeros();
                ax[[i, j]] = amplitude;
                ay[[i, j]] = amplitude;
                (ax, ay)
            }
        };
        Ok(fields)
    }
}
