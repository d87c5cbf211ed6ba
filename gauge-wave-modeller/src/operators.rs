//! Finite-difference operators on a uniform 2D grid.
//!
//! Every stencil uses `dx` for both axes. The boundary treatment is fixed when
//! the operator is built:
//!
//! - [`BoundaryPolicy::Periodic`] wraps indices, the same as a cyclic shift of
//!   the array.
//! - [`BoundaryPolicy::Absorbing`] never reaches past the edge. Cells whose
//!   stencil would need a neighbour outside the grid get zero.

use crate::grid::Grid;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    Periodic,
    #[default]
    Absorbing,
}

/// First-difference stencil used for gradient terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stencil {
    /// `(z[i+1] - z[i-1]) / 2dx`
    Centred,
    /// `(z[i+1] - z[i]) / dx`, the pair whose adjoint composition is the 5-point Laplacian
    Forward,
}

#[derive(Debug, Clone)]
pub struct SpatialOperator {
    policy: BoundaryPolicy,
    nx: usize,
    ny: usize,
    dx: f64,
}

#[inline]
fn next(i: usize, n: usize) -> usize {
    if i + 1 == n {
        0
    } else {
        i + 1
    }
}

#[inline]
fn prev(i: usize, n: usize) -> usize {
    if i == 0 {
        n - 1
    } else {
        i - 1
    }
}

impl SpatialOperator {
    pub fn new(grid: &Grid, policy: BoundaryPolicy) -> Self {
        Self {
            policy,
            nx: grid.nx,
            ny: grid.ny,
            dx: grid.dx,
        }
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    pub fn laplacian(&self, z: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros(z.dim());
        self.laplacian_into(z, &mut out);
        out
    }

    /// Writes the 5-point Laplacian of `z` into `out` without allocating.
    pub fn laplacian_into(&self, z: &Array2<f64>, out: &mut Array2<f64>) {
        debug_assert_eq!(z.dim(), (self.nx, self.ny));
        debug_assert_eq!(out.dim(), (self.nx, self.ny));
        let (nx, ny) = (self.nx, self.ny);
        let inv_dx2 = 1.0 / (self.dx * self.dx);

        match self.policy {
            BoundaryPolicy::Periodic => {
                for i in 0..nx {
                    let (ip, im) = (next(i, nx), prev(i, nx));
                    for j in 0..ny {
                        let (jp, jm) = (next(j, ny), prev(j, ny));
                        out[[i, j]] = (z[[ip, j]] + z[[im, j]] + z[[i, jp]] + z[[i, jm]]
                            - 4.0 * z[[i, j]])
                            * inv_dx2;
                    }
                }
            }
            BoundaryPolicy::Absorbing => {
                // Outermost ring stays at zero
                out.fill(0.0);
                for i in 1..nx.saturating_sub(1) {
                    for j in 1..ny.saturating_sub(1) {
                        out[[i, j]] = (z[[i + 1, j]] + z[[i - 1, j]] + z[[i, j + 1]] + z[[i, j - 1]]
                            - 4.0 * z[[i, j]])
                            * inv_dx2;
                    }
                }
            }
        }
    }

    /// Centred derivative along axis 0.
    pub fn ddx(&self, z: &Array2<f64>) -> Array2<f64> {
        let (nx, ny) = (self.nx, self.ny);
        let inv = 1.0 / (2.0 * self.dx);
        let mut d = Array2::zeros((nx, ny));

        match self.policy {
            BoundaryPolicy::Periodic => {
                for i in 0..nx {
                    let (ip, im) = (next(i, nx), prev(i, nx));
                    for j in 0..ny {
                        d[[i, j]] = (z[[ip, j]] - z[[im, j]]) * inv;
                    }
                }
            }
            BoundaryPolicy::Absorbing => {
                for i in 1..nx.saturating_sub(1) {
                    for j in 0..ny {
                        d[[i, j]] = (z[[i + 1, j]] - z[[i - 1, j]]) * inv;
                    }
                }
            }
        }
        d
    }

    /// Centred derivative along axis 1.
    pub fn ddy(&self, z: &Array2<f64>) -> Array2<f64> {
        let (nx, ny) = (self.nx, self.ny);
        let inv = 1.0 / (2.0 * self.dx);
        let mut d = Array2::zeros((nx, ny));

        match self.policy {
            BoundaryPolicy::Periodic => {
                for i in 0..nx {
                    for j in 0..ny {
                        d[[i, j]] = (z[[i, next(j, ny)]] - z[[i, prev(j, ny)]]) * inv;
                    }
                }
            }
            BoundaryPolicy::Absorbing => {
                for i in 0..nx {
                    for j in 1..ny.saturating_sub(1) {
                        d[[i, j]] = (z[[i, j + 1]] - z[[i, j - 1]]) * inv;
                    }
                }
            }
        }
        d
    }

    /// One-sided forward derivative along axis 0.
    pub fn forward_ddx(&self, z: &Array2<f64>) -> Array2<f64> {
        let (nx, ny) = (self.nx, self.ny);
        let inv = 1.0 / self.dx;
        let mut d = Array2::zeros((nx, ny));

        let rows = match self.policy {
            BoundaryPolicy::Periodic => nx,
            BoundaryPolicy::Absorbing => nx.saturating_sub(1),
        };
        for i in 0..rows {
            let ip = next(i, nx);
            for j in 0..ny {
                d[[i, j]] = (z[[ip, j]] - z[[i, j]]) * inv;
            }
        }
        d
    }

    /// One-sided forward derivative along axis 1.
    pub fn forward_ddy(&self, z: &Array2<f64>) -> Array2<f64> {
        let (nx, ny) = (self.nx, self.ny);
        let inv = 1.0 / self.dx;
        let mut d = Array2::zeros((nx, ny));

        let cols = match self.policy {
            BoundaryPolicy::Periodic => ny,
            BoundaryPolicy::Absorbing => ny.saturating_sub(1),
        };
        for i in 0..nx {
            for j in 0..cols {
                d[[i, j]] = (z[[i, next(j, ny)]] - z[[i, j]]) * inv;
            }
        }
        d
    }

    /// Bz = ∂x Ay − ∂y Ax with centred differences.
    pub fn curl(&self, ax: &Array2<f64>, ay: &Array2<f64>) -> Array2<f64> {
        let mut bz = self.ddx(ay) - self.ddy(ax);

        if self.policy == BoundaryPolicy::Absorbing {
            let (nx, ny) = (self.nx, self.ny);
            for j in 0..ny {
                bz[[0, j]] = 0.0;
                bz[[nx - 1, j]] = 0.0;
            }
            for i in 0..nx {
                bz[[i, 0]] = 0.0;
                bz[[i, ny - 1]] = 0.0;
            }
        }
        bz
    }

    /// Sum of squared first differences of both components, `|∇Ax|² + |∇Ay|²`.
    pub fn gradient_squared(
        &self,
        ax: &Array2<f64>,
        ay: &Array2<f64>,
        stencil: Stencil,
    ) -> Array2<f64> {
        let (dax_dx, dax_dy, day_dx, day_dy) = match stencil {
            Stencil::Centred => (self.ddx(ax), self.ddy(ax), self.ddx(ay), self.ddy(ay)),
            Stencil::Forward => (
                self.forward_ddx(ax),
                self.forward_ddy(ax),
                self.forward_ddx(ay),
                self.forward_ddy(ay),
            ),
        };

        let mut grad2 = Array2::zeros(ax.dim());
        Zip::from(&mut grad2)
            .and(&dax_dx)
            .and(&dax_dy)
            .and(&day_dx)
            .and(&day_dy)
            .for_each(|g, &a, &b, &c, &d| *g = a * a + b * b + c * c + d * d);
        grad2
    }

    /// `0.5 * (Vx² + Vy² + c² |∇A|²)` per cell.
    ///
    /// `ax`/`ay` are the potentials the gradient is taken of; the caller decides
    /// which time level those are.
    pub fn energy_density(
        &self,
        ax: &Array2<f64>,
        ay: &Array2<f64>,
        vx: &Array2<f64>,
        vy: &Array2<f64>,
        c: f64,
        stencil: Stencil,
    ) -> Array2<f64> {
        let c2 = c * c;
        let mut density = self.gradient_squared(ax, ay, stencil);
        Zip::from(&mut density)
            .and(vx)
            .and(vy)
            .for_each(|e, &u, &v| *e = 0.5 * (u * u + v * v + c2 * *e));
        density
    }
}
