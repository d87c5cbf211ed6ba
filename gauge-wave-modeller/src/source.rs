use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Which potential component a source drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    #[default]
    Ax,
    Ay,
}

/// Sinusoidal point source, `amplitude * sin(omega * step * dt)` at one cell.
///
/// Stateless: evaluating the same step twice gives the same forcing.
#[derive(Clone, Debug, PartialEq)]
pub struct PointSource {
    pub i: usize,       // Grid position x
    pub j: usize,       // Grid position y
    pub amplitude: f64, // Peak forcing
    pub omega: f64,     // Angular frequency (rad / time unit)
    pub component: Component,
}

impl PointSource {
    pub fn new(i: usize, j: usize, amplitude: f64, omega: f64) -> Self {
        Self {
            i,
            j,
            amplitude,
            omega,
            component: Component::Ax,
        }
    }

    pub fn on_component(mut self, component: Component) -> Self {
        self.component = component;
        self
    }

    pub fn value(&self, step: usize, dt: f64) -> f64 {
        self.amplitude * (self.omega * step as f64 * dt).sin()
    }
}

/// Evaluates a source on the full grid.
#[derive(Clone, Debug)]
pub struct SourceInjector {
    source: PointSource,
    shape: (usize, usize),
    dt: f64,
}

impl SourceInjector {
    pub fn new(source: PointSource, shape: (usize, usize), dt: f64) -> Self {
        Self { source, shape, dt }
    }

    pub fn point(&self) -> &PointSource {
        &self.source
    }

    pub fn value(&self, step: usize) -> f64 {
        self.source.value(step, self.dt)
    }

    /// Forcing arrays `(Sx, Sy)` for `step`, zero except at the source cell.
    pub fn source(&self, step: usize) -> (Array2<f64>, Array2<f64>) {
        let mut sx = Array2::zeros(self.shape);
        let mut sy = Array2::zeros(self.shape);
        self.add_to(step, &mut sx, &mut sy);
        (sx, sy)
    }

    /// Adds the forcing for `step` into existing buffers.
    pub fn add_to(&self, step: usize, sx: &mut Array2<f64>, sy: &mut Array2<f64>) {
        let s = self.value(step);
        let target = match self.source.component {
            Component::Ax => sx,
            Component::Ay => sy,
        };
        target[[self.source.i, self.source.j]] += s;
    }
}
