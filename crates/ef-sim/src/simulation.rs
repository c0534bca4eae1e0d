//! Simulation driver: one model, one integrator, one time series.

use ef_core::{Real, TimeSeries};
use ef_model::SecihurdModel;
use ef_solver::CashKarp;
use nalgebra::DVector;

use crate::error::{SimError, SimResult};

/// Decides which accepted steps are recorded in the result series.
///
/// The current state and the last point before a target time are always
/// kept so `advance` stays exact regardless of the policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SamplingPolicy {
    /// Record every accepted integrator step (the default).
    #[default]
    KeepAll,
    /// Record only the first step at or past each integer day.
    IntegerDays,
}

impl SamplingPolicy {
    fn keep(self, previous_t: Real, t: Real) -> bool {
        match self {
            SamplingPolicy::KeepAll => true,
            SamplingPolicy::IntegerDays => t.floor() > previous_t.floor() || t == t.floor(),
        }
    }
}

/// A single node's simulation: owns the model, the integrator core, the
/// current state and the recorded time series.
#[derive(Clone, Debug)]
pub struct Simulation {
    model: SecihurdModel,
    core: CashKarp,
    policy: SamplingPolicy,
    t: Real,
    y: DVector<Real>,
    dt: Real,
    result: TimeSeries,
}

impl Simulation {
    /// Create a simulation starting at `t0` with proposed step `dt`.
    ///
    /// The initial state is taken from the model's populations and
    /// recorded as the first time point.
    pub fn new(model: SecihurdModel, t0: Real, dt: Real) -> SimResult<Self> {
        Self::with_core(model, t0, dt, CashKarp::default())
    }

    pub fn with_core(
        model: SecihurdModel,
        t0: Real,
        dt: Real,
        core: CashKarp,
    ) -> SimResult<Self> {
        if !(dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        model.check_constraints()?;
        let y = model.populations.get_compartments();
        let mut result = TimeSeries::new(y.len());
        result.add_time_point(t0, y.clone());
        Ok(Self {
            model,
            core,
            policy: SamplingPolicy::default(),
            t: t0,
            y,
            dt,
            result,
        })
    }

    pub fn set_sampling_policy(&mut self, policy: SamplingPolicy) {
        self.policy = policy;
    }

    pub fn model(&self) -> &SecihurdModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut SecihurdModel {
        &mut self.model
    }

    pub fn result(&self) -> &TimeSeries {
        &self.result
    }

    /// Time of the current (most recently integrated) state.
    pub fn current_time(&self) -> Real {
        self.t
    }

    /// The current state vector.
    pub fn current_state(&self) -> &DVector<Real> {
        &self.y
    }

    /// Mutate the current state in place (used by the migration loop
    /// between ticks). The recorded last time point is kept in sync.
    pub fn apply_state_delta(&mut self, delta: &DVector<Real>) {
        self.y += delta;
        if self.result.last_time() == self.t {
            self.result.last_value_mut().copy_from(&self.y);
        }
    }

    /// Advance until the current time reaches `t_target`, recording
    /// accepted steps per the sampling policy.
    ///
    /// Fails only when the integrator stalls.
    pub fn advance(&mut self, t_target: Real) -> SimResult<()> {
        let model = &self.model;
        let mut rhs = |t: Real, y: &DVector<Real>, dydt: &mut DVector<Real>| {
            model.get_derivatives(y, t, dydt);
        };
        while self.t < t_target - 1e-10 {
            let outcome = self
                .core
                .step(&mut rhs, self.t, &mut self.y, self.dt, t_target)?;
            let keep = self.policy.keep(self.t, outcome.t) || outcome.t >= t_target - 1e-10;
            self.t = outcome.t;
            self.dt = outcome.dt_next;
            if keep {
                self.result.add_time_point(self.t, self.y.clone());
            }
        }
        Ok(())
    }
}

/// One-shot convenience: simulate `model` over `[t0, tmax]` and return
/// the recorded series.
pub fn simulate(
    t0: Real,
    tmax: Real,
    dt: Real,
    model: SecihurdModel,
) -> SimResult<TimeSeries> {
    let mut sim = Simulation::new(model, t0, dt)?;
    sim.advance(tmax)?;
    Ok(sim.result.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_model::SecihurdModel;

    #[test]
    fn records_initial_state_and_reaches_target() {
        let mut model = SecihurdModel::new(1);
        model.populations.set_total(1000.0);
        let mut sim = Simulation::new(model, 0.0, 0.1).unwrap();
        sim.advance(5.0).unwrap();
        let result = sim.result();
        assert_eq!(result.time(0), 0.0);
        assert!((result.last_time() - 5.0).abs() < 1e-9);
        for pair in result.times().windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn rejects_non_positive_dt() {
        let model = SecihurdModel::new(1);
        assert!(Simulation::new(model, 0.0, 0.0).is_err());
    }

    #[test]
    fn rejects_constraint_violations_up_front() {
        let mut model = SecihurdModel::new(1);
        model.parameters.serial_interval[ef_core::AgeGroup(0)].set_value(10.0);
        assert!(matches!(
            Simulation::new(model, 0.0, 0.1),
            Err(SimError::Model(_))
        ));
    }

    #[test]
    fn integer_day_policy_thins_output() {
        let mut model = SecihurdModel::new(1);
        model.populations.set_total(1000.0);

        let mut keep_all = Simulation::new(model.clone(), 0.0, 0.1).unwrap();
        keep_all.advance(10.0).unwrap();

        let mut thinned = Simulation::new(model, 0.0, 0.1).unwrap();
        thinned.set_sampling_policy(SamplingPolicy::IntegerDays);
        thinned.advance(10.0).unwrap();

        assert!(thinned.result().num_time_points() <= keep_all.result().num_time_points());
        // thinning must not change the final state
        assert_eq!(thinned.result().last_value(), keep_all.result().last_value());
    }
}
