//! Energy bookkeeping and drift monitoring.
//!
//! None of this feeds back into the integration; the integrator only appends
//! to it.

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// How the energy density picks its time level and gradient stencil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyScheme {
    /// Half-step velocity with forward differences of the time-centred potential.
    /// Conserved to O(dt²) by the undamped scheme.
    #[default]
    Staggered,
    /// Centred differences of the committed potential.
    Collocated,
}

/// Integrated energy per diagnostic step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyTrace {
    total: Vec<f64>,
    interior: Vec<f64>,
}

impl EnergyTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, total: f64, interior: f64) {
        self.total.push(total);
        self.interior.push(interior);
    }

    pub fn total(&self) -> &[f64] {
        &self.total
    }

    pub fn interior(&self) -> &[f64] {
        &self.interior
    }

    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.total.last()?, *self.interior.last()?))
    }

    /// `|E_last - E_first| / |E_first|` over the total trace.
    pub fn relative_drift(&self) -> Option<f64> {
        let first = *self.total.first()?;
        let last = *self.total.last()?;
        if first.abs() > 1e-300 {
            Some((last - first).abs() / first.abs())
        } else {
            Some((last - first).abs())
        }
    }
}

/// Integrates the energy density over the whole grid and over the masked interior.
///
/// Sums run sequentially in row-major order (i outer, j inner), so results are
/// reproducible bit for bit.
pub fn integrate(density: &Array2<f64>, interior: &Array2<bool>, cell_area: f64) -> (f64, f64) {
    let mut total = 0.0;
    let mut inner = 0.0;
    Zip::from(density).and(interior).for_each(|&e, &m| {
        total += e;
        if m {
            inner += e;
        }
    });
    (total * cell_area, inner * cell_area)
}

/// Raised when total energy grows faster than the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstabilityWarning {
    pub step: usize,
    /// `E(step) / E(step - window)`
    pub ratio: f64,
}

/// Watches the total energy trace for runaway growth over a fixed window.
#[derive(Debug, Clone, PartialEq)]
pub struct InstabilityMonitor {
    pub window: usize,
    pub growth_threshold: f64,
    warnings: Vec<InstabilityWarning>,
}

impl InstabilityMonitor {
    pub fn new(window: usize, growth_threshold: f64) -> Self {
        Self {
            window: window.max(1),
            growth_threshold,
            warnings: Vec::new(),
        }
    }

    /// Checks the newest trace value; `step` is the step it belongs to.
    pub fn check(&mut self, trace: &EnergyTrace, step: usize) -> Option<InstabilityWarning> {
        let total = trace.total();
        if total.len() <= self.window {
            return None;
        }
        let now = total[total.len() - 1];
        let then = total[total.len() - 1 - self.window];
        let ratio = if then > 0.0 { now / then } else { f64::INFINITY };

        if !now.is_finite() || (now > 0.0 && ratio > self.growth_threshold) {
            let warning = InstabilityWarning { step, ratio };
            log::warn!(
                "Energy grew by a factor of {:.3e} over the last {} steps (step {}); dt may violate the CFL bound",
                ratio,
                self.window,
                step
            );
            self.warnings.push(warning);
            return Some(warning);
        }
        None
    }

    pub fn warnings(&self) -> &[InstabilityWarning] {
        &self.warnings
    }
}
