use ndarray::{Array1, Array2};

/// Static sponge-layer damping coefficients γ(x, y).
///
/// Built once from two per-axis cubic ramps combined by maximum. γ is zero
/// wherever the cell is at least `width` cells away from every edge and rises
/// to `gamma_max` at the outermost cells.
#[derive(Debug, Clone)]
pub struct DampingProfile {
    gamma: Array2<f64>,
    interior: Array2<bool>,
    width: usize,
    gamma_max: f64,
}

/// Cubic ramp along one axis: `m * clamp((w - d) / w, 0, 1)^3`, `d` the distance to the nearest end.
pub fn ramp_1d(n: usize, w: usize, m: f64) -> Array1<f64> {
    if w == 0 {
        return Array1::zeros(n);
    }
    Array1::from_shape_fn(n, |i| {
        let d = i.min(n - 1 - i) as f64;
        let g = ((w as f64 - d) / w as f64).clamp(0.0, 1.0);
        m * g.powi(3)
    })
}

impl DampingProfile {
    pub fn build(nx: usize, ny: usize, width: usize, gamma_max: f64) -> Self {
        let gx = ramp_1d(nx, width, gamma_max);
        let gy = ramp_1d(ny, width, gamma_max);
        let gamma = Array2::from_shape_fn((nx, ny), |(i, j)| gx[i].max(gy[j]));

        let interior = Array2::from_shape_fn((nx, ny), |(i, j)| {
            i >= width && width < nx - i && j >= width && width < ny - j
        });

        Self {
            gamma,
            interior,
            width,
            gamma_max,
        }
    }

    /// No damping anywhere; the interior mask covers the whole grid.
    pub fn none(nx: usize, ny: usize) -> Self {
        Self::build(nx, ny, 0, 0.0)
    }

    pub fn gamma(&self) -> &Array2<f64> {
        &self.gamma
    }

    /// Cells outside the sponge layer.
    pub fn interior_mask(&self) -> &Array2<bool> {
        &self.interior
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn gamma_max(&self) -> f64 {
        self.gamma_max
    }

    pub fn is_undamped(&self) -> bool {
        self.gamma_max == 0.0 || self.width == 0
    }
}
