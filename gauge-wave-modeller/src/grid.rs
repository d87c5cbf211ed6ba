use crate::error::ConfigurationError;
use ndarray::Array2;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub nx: usize, // Number of cells in x direction
    pub ny: usize, // Number of cells in y direction
    pub lx: f64,   // Physical extent in x
    pub ly: f64,   // Physical extent in y
    pub dx: f64,   // Cell size in x (lx / nx)
    pub dy: f64,   // Cell size in y (ly / ny)
}

impl Grid {
    pub fn new(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self, ConfigurationError> {
        if nx == 0 || ny == 0 {
            return Err(ConfigurationError::EmptyGrid { nx, ny });
        }
        if !(lx > 0.0 && ly > 0.0) {
            return Err(ConfigurationError::NonPositiveExtent { lx, ly });
        }

        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        // The stencils use dx on both axes
        if ((dx - dy) / dx).abs() > 1e-9 {
            log::warn!(
                "Anisotropic grid spacing (dx={}, dy={}); stencils assume dx == dy",
                dx,
                dy
            );
        }

        Ok(Grid {
            nx,
            ny,
            lx,
            ly,
            dx,
            dy,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn x_coord(&self, i: usize) -> f64 {
        // Centred coordinate, origin in the middle of the domain
        (i as f64 - self.nx as f64 / 2.0) * self.dx
    }

    pub fn y_coord(&self, j: usize) -> f64 {
        (j as f64 - self.ny as f64 / 2.0) * self.dy
    }

    pub fn in_bounds(&self, i: usize, j: usize) -> bool {
        i < self.nx && j < self.ny
    }

    pub fn cell_area(&self) -> f64 {
        self.dx * self.dy
    }

    pub fn zeros(&self) -> Array2<f64> {
        Array2::zeros(self.shape())
    }

    /// Evaluates `f(x, y)` at every cell centre, `ij` indexing.
    pub fn sample<F>(&self, f: F) -> Array2<f64>
    where
        F: Fn(f64, f64) -> f64,
    {
        Array2::from_shape_fn(self.shape(), |(i, j)| f(self.x_coord(i), self.y_coord(j)))
    }

    /// Largest stable time step for the 5-point scheme at wave speed `c`.
    pub fn cfl_limit(&self, c: f64) -> f64 {
        Self::cfl_limit_for_spacing(self.dx, c)
    }

    /// `dx / (c sqrt 2)`, for callers that only know the spacing.
    pub fn cfl_limit_for_spacing(dx: f64, c: f64) -> f64 {
        dx / (c * std::f64::consts::SQRT_2)
    }

    pub fn dt_from_cfl(&self, c: f64, safety: f64) -> f64 {
        safety * self.cfl_limit(c)
    }
}
