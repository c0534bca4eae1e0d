//! Cash-Karp 5(4) embedded Runge-Kutta with adaptive step control.

use ef_core::{all_finite, Real, TimeSeries};
use nalgebra::DVector;
use tracing::warn;

use crate::error::{SolverError, SolverResult};

// Cash-Karp tableau: nodes, stage coefficients, 5th-order weights and the
// embedded 4th-order weights sharing the same six stages.
const C: [Real; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 3.0 / 5.0, 1.0, 7.0 / 8.0];

const A: [[Real; 5]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [3.0 / 10.0, -9.0 / 10.0, 6.0 / 5.0, 0.0, 0.0],
    [-11.0 / 54.0, 5.0 / 2.0, -70.0 / 27.0, 35.0 / 27.0, 0.0],
    [
        1631.0 / 55296.0,
        175.0 / 512.0,
        575.0 / 13824.0,
        44275.0 / 110592.0,
        253.0 / 4096.0,
    ],
];

const B5: [Real; 6] = [
    37.0 / 378.0,
    0.0,
    250.0 / 621.0,
    125.0 / 594.0,
    0.0,
    512.0 / 1771.0,
];

const B4: [Real; 6] = [
    2825.0 / 27648.0,
    0.0,
    18575.0 / 48384.0,
    13525.0 / 55296.0,
    277.0 / 14336.0,
    1.0 / 4.0,
];

const SAFETY: Real = 0.9;
const MIN_SHRINK: Real = 0.2;
const MAX_GROW: Real = 5.0;

/// Step-size controller configuration.
#[derive(Clone, Copy, Debug)]
pub struct StepControl {
    /// Absolute tolerance on each state component
    pub abs_tol: Real,
    /// Relative tolerance on each state component
    pub rel_tol: Real,
    /// Smallest step the controller may take
    pub dt_min: Real,
    /// Largest step the controller may take
    pub dt_max: Real,
}

impl Default for StepControl {
    fn default() -> Self {
        Self {
            abs_tol: 1e-10,
            rel_tol: 5e-4,
            dt_min: 1e-6,
            dt_max: Real::INFINITY,
        }
    }
}

/// Result of one accepted step.
#[derive(Clone, Copy, Debug)]
pub struct StepOutcome {
    /// Time reached by the step
    pub t: Real,
    /// Step size to propose next
    pub dt_next: Real,
}

/// Cash-Karp 5(4) integrator core.
///
/// Stateless apart from its configuration; callers own `(t, y)` and the
/// output buffer.
#[derive(Clone, Debug)]
pub struct CashKarp {
    control: StepControl,
}

impl Default for CashKarp {
    fn default() -> Self {
        Self::new(StepControl::default())
    }
}

impl CashKarp {
    pub fn new(control: StepControl) -> Self {
        Self { control }
    }

    pub fn control(&self) -> &StepControl {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut StepControl {
        &mut self.control
    }

    /// Take one accepted step from `(t, y)` towards `t_stop`, writing the
    /// new state into `y`.
    ///
    /// The proposed `dt` is clamped into `[dt_min, min(dt_max, t_stop - t)]`.
    /// Rejected trials shrink the step; a trial pinned at `dt_min` is
    /// accepted with a warning rather than rejected. Only a non-finite
    /// state at `dt_min` stalls the integration.
    pub fn step<F>(
        &self,
        f: &mut F,
        t: Real,
        y: &mut DVector<Real>,
        dt: Real,
        t_stop: Real,
    ) -> SolverResult<StepOutcome>
    where
        F: FnMut(Real, &DVector<Real>, &mut DVector<Real>),
    {
        if !(dt > 0.0) {
            return Err(SolverError::InvalidArg {
                what: "step size must be positive",
            });
        }
        if t_stop <= t {
            return Err(SolverError::InvalidArg {
                what: "t_stop must lie ahead of t",
            });
        }
        let ctrl = &self.control;
        let n = y.len();

        let mut stages: Vec<DVector<Real>> = vec![DVector::zeros(n); 6];
        let mut y_stage = DVector::zeros(n);
        let mut h = dt.clamp(ctrl.dt_min, ctrl.dt_max);

        loop {
            // never overshoot the stop time
            let h_capped = h.min(t_stop - t);
            let at_floor = h_capped <= ctrl.dt_min;

            for s in 0..6 {
                y_stage.copy_from(y);
                for j in 0..s {
                    if A[s][j] != 0.0 {
                        y_stage.axpy(h_capped * A[s][j], &stages[j], 1.0);
                    }
                }
                f(t + C[s] * h_capped, &y_stage, &mut stages[s]);
            }

            let mut y5 = y.clone();
            let mut y4 = y.clone();
            for s in 0..6 {
                if B5[s] != 0.0 {
                    y5.axpy(h_capped * B5[s], &stages[s], 1.0);
                }
                if B4[s] != 0.0 {
                    y4.axpy(h_capped * B4[s], &stages[s], 1.0);
                }
            }

            // scaled infinity-norm error estimate
            let mut err: Real = 0.0;
            for i in 0..n {
                let scale = ctrl.abs_tol + ctrl.rel_tol * y[i].abs().max(y5[i].abs());
                err = err.max((y5[i] - y4[i]).abs() / scale);
            }

            if !err.is_finite() || !all_finite(y5.as_slice()) {
                if at_floor {
                    return Err(SolverError::Stall {
                        t,
                        dt_min: ctrl.dt_min,
                    });
                }
                h = (h * MIN_SHRINK).max(ctrl.dt_min);
                continue;
            }

            let accepted = err <= 1.0 || at_floor;
            if accepted && err > 1.0 {
                warn!(t, dt = h_capped, err, "accepting step at dt_min despite error");
            }

            let factor = if err > 0.0 {
                (SAFETY * err.powf(-0.2)).clamp(MIN_SHRINK, MAX_GROW)
            } else {
                MAX_GROW
            };
            let dt_next = (h_capped * factor).clamp(ctrl.dt_min, ctrl.dt_max);

            if accepted {
                y.copy_from(&y5);
                return Ok(StepOutcome {
                    t: t + h_capped,
                    dt_next,
                });
            }
            h = dt_next.min(h_capped);
        }
    }

    /// Integrate from `(t0, y0)` to `t_stop`, appending one time point per
    /// accepted step to `series` (the initial state is not appended).
    ///
    /// Returns the step size to propose for a continuation.
    pub fn integrate<F>(
        &self,
        f: &mut F,
        t0: Real,
        y0: &DVector<Real>,
        dt: Real,
        t_stop: Real,
        series: &mut TimeSeries,
    ) -> SolverResult<Real>
    where
        F: FnMut(Real, &DVector<Real>, &mut DVector<Real>),
    {
        let mut t = t0;
        let mut y = y0.clone();
        let mut h = dt;
        while t < t_stop - 1e-10 {
            let outcome = self.step(f, t, &mut y, h, t_stop)?;
            t = outcome.t;
            h = outcome.dt_next;
            series.add_time_point(t, y.clone());
        }
        Ok(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rhs_preserves_state_exactly() {
        let core = CashKarp::default();
        let mut f = |_t: Real, _y: &DVector<Real>, dydt: &mut DVector<Real>| {
            dydt.fill(0.0);
        };
        let y0 = DVector::from_vec(vec![1.0, -2.5, 1e6]);
        let mut series = TimeSeries::new(3);
        core.integrate(&mut f, 0.0, &y0, 0.1, 100.0, &mut series)
            .unwrap();
        assert!(!series.is_empty());
        for (_, value) in series.iter() {
            assert_eq!(value, &y0);
        }
        assert!((series.last_time() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn exponential_decay_matches_analytic_solution() {
        let core = CashKarp::new(StepControl {
            abs_tol: 1e-10,
            rel_tol: 1e-7,
            ..StepControl::default()
        });
        let mut f = |_t: Real, y: &DVector<Real>, dydt: &mut DVector<Real>| {
            dydt[0] = -y[0];
        };
        let y0 = DVector::from_vec(vec![1.0]);
        let mut series = TimeSeries::new(1);
        core.integrate(&mut f, 0.0, &y0, 0.1, 5.0, &mut series).unwrap();
        for (t, value) in series.iter() {
            assert!(
                (value[0] - (-t).exp()).abs() < 1e-5,
                "at t = {t}: {} vs {}",
                value[0],
                (-t).exp()
            );
        }
    }

    #[test]
    fn fifth_order_scheme_is_exact_for_quartic() {
        // dy/dt = 4 t^3 integrates exactly for any step size
        let core = CashKarp::default();
        let mut f = |t: Real, _y: &DVector<Real>, dydt: &mut DVector<Real>| {
            dydt[0] = 4.0 * t * t * t;
        };
        let y0 = DVector::from_vec(vec![0.0]);
        let mut series = TimeSeries::new(1);
        core.integrate(&mut f, 0.0, &y0, 0.5, 2.0, &mut series).unwrap();
        let last = series.last_value();
        assert!((last[0] - 16.0).abs() < 1e-9);
    }

    #[test]
    fn never_oversteps_the_stop_time() {
        let core = CashKarp::default();
        let mut f = |_t: Real, y: &DVector<Real>, dydt: &mut DVector<Real>| {
            dydt[0] = y[0];
        };
        let y0 = DVector::from_vec(vec![1.0]);
        let mut series = TimeSeries::new(1);
        core.integrate(&mut f, 0.0, &y0, 10.0, 1.0, &mut series).unwrap();
        for (t, _) in series.iter() {
            assert!(t <= 1.0 + 1e-12);
        }
        assert!((series.last_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_rhs_stalls() {
        let core = CashKarp::new(StepControl {
            dt_min: 1e-3,
            ..StepControl::default()
        });
        let mut f = |_t: Real, _y: &DVector<Real>, dydt: &mut DVector<Real>| {
            dydt[0] = Real::NAN;
        };
        let y0 = DVector::from_vec(vec![1.0]);
        let mut series = TimeSeries::new(1);
        let err = core
            .integrate(&mut f, 0.0, &y0, 0.1, 1.0, &mut series)
            .unwrap_err();
        assert!(matches!(err, SolverError::Stall { .. }));
    }

    #[test]
    fn rejects_invalid_arguments() {
        let core = CashKarp::default();
        let mut f = |_t: Real, _y: &DVector<Real>, dydt: &mut DVector<Real>| dydt.fill(0.0);
        let mut y = DVector::from_vec(vec![1.0]);
        assert!(core.step(&mut f, 0.0, &mut y, 0.0, 1.0).is_err());
        assert!(core.step(&mut f, 1.0, &mut y, 0.1, 1.0).is_err());
    }

    #[test]
    fn stiff_problem_shrinks_steps_but_advances() {
        let core = CashKarp::default();
        let mut f = |_t: Real, y: &DVector<Real>, dydt: &mut DVector<Real>| {
            dydt[0] = -50.0 * y[0];
        };
        let y0 = DVector::from_vec(vec![1.0]);
        let mut series = TimeSeries::new(1);
        core.integrate(&mut f, 0.0, &y0, 1.0, 1.0, &mut series).unwrap();
        // more than one step was needed and the result is close to e^-50
        assert!(series.num_time_points() > 3);
        assert!(series.last_value()[0].abs() < 1e-3);
        for pair in series.times().windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }
}
