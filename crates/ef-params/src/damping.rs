//! Time-stamped multiplicative reductions of contact rates.

use ef_core::{clamp_unit, Real};
use nalgebra::DMatrix;

/// One damping entry: at `time`, contact rates are reduced by `value`.
///
/// Entries act as deltas; the reduction effective at a query time is the
/// clamped sum of all entries up to that time.
#[derive(Clone, Debug, PartialEq)]
pub struct Damping {
    pub time: Real,
    pub value: DMatrix<Real>,
}

/// Damping sequence in insertion order.
///
/// The cumulative damping is a piecewise-constant, right-continuous step
/// function of time: an entry takes effect at its own time stamp.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dampings {
    entries: Vec<Damping>,
}

impl Dampings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a damping taking effect at `time`.
    pub fn add(&mut self, value: DMatrix<Real>, time: Real) {
        self.entries.push(Damping { time, value });
    }

    pub fn entries(&self) -> &[Damping] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cumulative damping matrix at time `t`, elementwise in `[0, 1]`.
    pub fn cumulative_at(&self, t: Real, nrows: usize, ncols: usize) -> DMatrix<Real> {
        let mut sum = DMatrix::zeros(nrows, ncols);
        for entry in &self.entries {
            if entry.time <= t {
                sum += &entry.value;
            }
        }
        sum.apply(|v| *v = clamp_unit(*v));
        sum
    }
}
