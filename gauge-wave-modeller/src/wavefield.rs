use crate::error::ConfigurationError;
use ndarray::{Array2, Zip};

/// Potential and velocity arrays, velocity-Verlet form.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavefield {
    pub ax: Array2<f64>,
    pub ay: Array2<f64>,
    pub vx: Array2<f64>,
    pub vy: Array2<f64>,
}

fn check_shape(
    name: &'static str,
    field: &Array2<f64>,
    expected: (usize, usize),
) -> Result<(), ConfigurationError> {
    if field.dim() != expected {
        return Err(ConfigurationError::ShapeMismatch {
            name,
            expected,
            actual: field.dim(),
        });
    }
    Ok(())
}

impl Wavefield {
    pub fn new(nx: usize, ny: usize) -> Self {
        Wavefield {
            ax: Array2::zeros((nx, ny)),
            ay: Array2::zeros((nx, ny)),
            vx: Array2::zeros((nx, ny)),
            vy: Array2::zeros((nx, ny)),
        }
    }

    /// Field at rest with the given potential.
    pub fn from_potential(
        ax: Array2<f64>,
        ay: Array2<f64>,
        shape: (usize, usize),
    ) -> Result<Self, ConfigurationError> {
        check_shape("ax", &ax, shape)?;
        check_shape("ay", &ay, shape)?;
        Ok(Wavefield {
            ax,
            ay,
            vx: Array2::zeros(shape),
            vy: Array2::zeros(shape),
        })
    }

    /// Builds the velocity form from leapfrog state, `V = (A - A_prev) / dt`.
    pub fn from_previous(
        ax: Array2<f64>,
        ay: Array2<f64>,
        ax_prev: &Array2<f64>,
        ay_prev: &Array2<f64>,
        dt: f64,
    ) -> Result<Self, ConfigurationError> {
        let shape = ax.dim();
        check_shape("ay", &ay, shape)?;
        check_shape("ax_prev", ax_prev, shape)?;
        check_shape("ay_prev", ay_prev, shape)?;

        let vx = (&ax - ax_prev) / dt;
        let vy = (&ay - ay_prev) / dt;
        Ok(Wavefield { ax, ay, vx, vy })
    }

    /// Leapfrog previous-step potentials, `A_prev = A - dt V`.
    pub fn previous(&self, dt: f64) -> (Array2<f64>, Array2<f64>) {
        (&self.ax - &(&self.vx * dt), &self.ay - &(&self.vy * dt))
    }

    /// Potentials at the half step behind the committed one, `A - dt/2 V`.
    pub fn half_step_potential(&self, dt: f64) -> (Array2<f64>, Array2<f64>) {
        let h = 0.5 * dt;
        let mut ax = self.ax.clone();
        let mut ay = self.ay.clone();
        Zip::from(&mut ax).and(&self.vx).for_each(|a, &v| *a -= h * v);
        Zip::from(&mut ay).and(&self.vy).for_each(|a, &v| *a -= h * v);
        (ax, ay)
    }

    pub fn dim(&self) -> (usize, usize) {
        self.ax.dim()
    }

    pub fn is_finite(&self) -> bool {
        [&self.ax, &self.ay, &self.vx, &self.vy]
            .iter()
            .all(|f| f.iter().all(|v| v.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_leapfrog_round_trip() {
        let ax = Array2::from_shape_fn((4, 3), |(i, j)| (i * 3 + j) as f64);
        let ay = Array2::from_shape_fn((4, 3), |(i, j)| (i as f64) - (j as f64));
        let ax_prev = ax.mapv(|v| 0.9 * v);
        let ay_prev = ay.mapv(|v| v + 0.2);

        let field = Wavefield::from_previous(ax.clone(), ay.clone(), &ax_prev, &ay_prev, 0.1).unwrap();
        assert_relative_eq!(field.vx[[2, 1]], 0.1 * 7.0 / 0.1, epsilon = 1e-12);
        assert_relative_eq!(field.vy[[0, 0]], -2.0, epsilon = 1e-12);

        let (px, py) = field.previous(0.1);
        for (a, b) in px.iter().zip(ax_prev.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        for (a, b) in py.iter().zip(ay_prev.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_half_step_is_midpoint() {
        let ax = Array2::from_elem((2, 2), 1.0);
        let ay = Array2::from_elem((2, 2), -1.0);
        let prev = Array2::zeros((2, 2));
        let field = Wavefield::from_previous(ax, ay, &prev, &prev, 0.5).unwrap();
        let (hx, hy) = field.half_step_potential(0.5);
        assert_relative_eq!(hx[[1, 1]], 0.5);
        assert_relative_eq!(hy[[0, 1]], -0.5);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = Wavefield::from_potential(Array2::zeros((4, 4)), Array2::zeros((4, 5)), (4, 4))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::ShapeMismatch {
                name: "ay",
                expected: (4, 4),
                actual: (4, 5)
            }
        );
    }
}
