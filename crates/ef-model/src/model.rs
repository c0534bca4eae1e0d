//! The SECIHURD model: parameters + populations + right-hand side.

use std::f64::consts::PI;

use ef_core::{AgeGroup, Real};
use nalgebra::DVector;
use tracing::warn;

use crate::compartments::{Compartment, NUM_COMPARTMENTS};
use crate::error::{ModelError, ModelResult};
use crate::parameters::Parameters;
use crate::populations::Populations;

/// ICU admissions start being redirected once occupancy crosses this
/// fraction of the capacity; at full capacity nothing is admitted.
const ICU_SHED_BAND: Real = 0.9;

/// Age-stratified SECIHURD compartment model.
///
/// The right-hand side is a pure function of `(t, y)`; parameters are
/// only ever mutated between integration steps by the orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct SecihurdModel {
    pub parameters: Parameters,
    pub populations: Populations,
}

impl SecihurdModel {
    pub fn new(num_groups: usize) -> Self {
        Self {
            parameters: Parameters::new(num_groups),
            populations: Populations::new(num_groups),
        }
    }

    pub fn num_groups(&self) -> usize {
        self.parameters.num_groups()
    }

    /// Length of the flattened state vector.
    pub fn num_elements(&self) -> usize {
        self.num_groups() * NUM_COMPARTMENTS
    }

    /// Clamp parameters and populations to legal values, logging each fix.
    pub fn apply_constraints(&mut self) {
        self.parameters.apply_constraints();
        for cell in self.populations.cells_mut() {
            let value = cell.value();
            if value < 0.0 {
                warn!(value, "negative population cell, resetting to 0");
                cell.set_value(0.0);
            }
        }
    }

    /// Read-only constraint check over parameters and populations.
    pub fn check_constraints(&self) -> ModelResult<()> {
        self.parameters.check_constraints()?;
        for cell in self.populations.cells() {
            if cell.value() < 0.0 {
                return Err(ModelError::InvalidParameter {
                    what: format!("negative population cell: {}", cell.value()),
                });
            }
        }
        Ok(())
    }

    /// Seasonal modulation `1 + k cos(2 pi (d0 + t) / 365)`.
    fn seasonality_factor(&self, t: Real) -> Real {
        let k = self.parameters.seasonality.value();
        1.0 + k * (2.0 * PI * (self.parameters.start_day + t) / 365.0).cos()
    }

    /// Estimated daily detections from carriers, the load on test-and-trace.
    fn test_and_trace_required(&self, y: &DVector<Real>) -> Real {
        let params = &self.parameters;
        AgeGroup::range(self.num_groups())
            .map(|age| {
                let carriers = y[self.flat(age, Compartment::Carrier)];
                let alpha = params.asymptomatic_cases_per_infectious.get(age);
                carriers * (1.0 - alpha) / self.carrier_stage_time(age)
            })
            .sum()
    }

    /// Mean time a carrier stays in the carrier stage before turning
    /// symptomatic or recovering. The constraint layer keeps this >= 0.5.
    fn carrier_stage_time(&self, age: AgeGroup) -> Real {
        self.parameters.serial_interval.get(age)
            - 0.5 * self.parameters.incubation_time.get(age)
    }

    /// Effective risk of infection from symptomatic cases for one age
    /// group: interpolates from `risk` towards `max_risk` as the required
    /// detections exceed the test-and-trace capacity.
    fn effective_symptomatic_risk(&self, age: AgeGroup, required: Real) -> Real {
        let params = &self.parameters;
        let risk = params.risk_of_infection_from_symptomatic.get(age);
        let max_risk = params.max_risk_of_infection_from_symptomatic.get(age);
        let capacity = params.test_and_trace_capacity.value();
        if required <= capacity || max_risk <= risk {
            return risk;
        }
        let stressed = risk + (max_risk - risk) * (required - capacity) / (4.0 * capacity);
        stressed.clamp(risk, max_risk)
    }

    fn flat(&self, age: AgeGroup, compartment: Compartment) -> usize {
        age.get() * NUM_COMPARTMENTS + compartment.index()
    }

    /// Compute `dydt = f(t, y)`.
    ///
    /// Pure: reads parameters, never mutates them, and is deterministic
    /// in `(t, y)`.
    pub fn get_derivatives(&self, y: &DVector<Real>, t: Real, dydt: &mut DVector<Real>) {
        use Compartment::*;

        let params = &self.parameters;
        let num_groups = self.num_groups();
        debug_assert_eq!(y.len(), self.num_elements());
        debug_assert_eq!(dydt.len(), self.num_elements());

        let season = self.seasonality_factor(t);
        let contact = params.contact_patterns.effective_at(t);
        let required = self.test_and_trace_required(y);

        let icu_occupancy: Real = AgeGroup::range(num_groups)
            .map(|age| y[self.flat(age, Icu)])
            .sum();
        let icu_capacity = params.icu_capacity.value();
        // fraction of ICU admissions still accepted; ramps to 0 at capacity
        let icu_admission = if icu_capacity <= 0.0 {
            0.0
        } else if icu_occupancy < ICU_SHED_BAND * icu_capacity {
            1.0
        } else {
            ((icu_capacity - icu_occupancy) / ((1.0 - ICU_SHED_BAND) * icu_capacity))
                .clamp(0.0, 1.0)
        };

        for i in AgeGroup::range(num_groups) {
            // force of infection on susceptibles of group i
            let mut lambda = 0.0;
            for j in AgeGroup::range(num_groups) {
                let base = j.get() * NUM_COMPARTMENTS;
                let group_size: Real = y.rows(base, NUM_COMPARTMENTS).sum();
                if group_size <= 0.0 {
                    continue;
                }
                let carriers = y[self.flat(j, Carrier)];
                let infected = y[self.flat(j, Infected)];
                let carrier_weight = params.relative_carrier_infectability.get(j);
                let symptomatic_risk = self.effective_symptomatic_risk(j, required);
                lambda += contact[(i.get(), j.get())]
                    * (carrier_weight * carriers + symptomatic_risk * infected)
                    / group_size;
            }
            lambda *= params.infection_probability_from_contact.get(i) * season;

            let incubation = params.incubation_time.get(i);
            let carrier_time = self.carrier_stage_time(i);
            let infectious_mild = params.infectious_time_mild.get(i);
            let home_to_hosp = params.home_to_hospitalized_time.get(i);
            let hosp_to_home = params.hospitalized_to_home_time.get(i);
            let hosp_to_icu = params.hospitalized_to_icu_time.get(i);
            let icu_to_home = params.icu_to_home_time.get(i);
            let icu_to_death = params.icu_to_death_time.get(i);

            let alpha = params
                .asymptomatic_cases_per_infectious
                .get(i)
                .clamp(0.0, 1.0);
            let rho = params.hospitalized_cases_per_infectious.get(i);
            let theta = params.icu_cases_per_hospitalized.get(i);
            let delta = params.deaths_per_hospitalized.get(i);

            let susceptible = y[self.flat(i, Susceptible)];
            let exposed = y[self.flat(i, Exposed)];
            let carrier = y[self.flat(i, Carrier)];
            let infected = y[self.flat(i, Infected)];
            let hospitalized = y[self.flat(i, Hospitalized)];
            let icu = y[self.flat(i, Icu)];

            let new_infections = lambda * susceptible;
            let exposed_out = exposed / incubation;
            let carrier_out = carrier / carrier_time;
            let to_icu = theta * hospitalized / hosp_to_icu;
            let icu_admitted = icu_admission * to_icu;

            dydt[self.flat(i, Susceptible)] = -new_infections;
            dydt[self.flat(i, Exposed)] = new_infections - exposed_out;
            dydt[self.flat(i, Carrier)] = exposed_out - carrier_out;
            dydt[self.flat(i, Infected)] = (1.0 - alpha) * carrier_out
                - infected * ((1.0 - rho) / infectious_mild + rho / home_to_hosp);
            dydt[self.flat(i, Hospitalized)] = rho * infected / home_to_hosp
                - hospitalized * ((1.0 - theta) / hosp_to_home + theta / hosp_to_icu);
            dydt[self.flat(i, Icu)] =
                icu_admitted - icu * ((1.0 - delta) / icu_to_home + delta / icu_to_death);
            dydt[self.flat(i, Recovered)] = alpha * carrier_out
                + (1.0 - rho) * infected / infectious_mild
                + (1.0 - theta) * hospitalized / hosp_to_home
                + (1.0 - delta) * icu / icu_to_home;
            dydt[self.flat(i, Dead)] =
                delta * icu / icu_to_death + (to_icu - icu_admitted);
        }
    }

    /// Fraction of the population that is infectious and symptomatic,
    /// aggregated over age groups.
    pub fn get_infections_relative(&self, _t: Real, y: &DVector<Real>) -> Real {
        let infected: Real = AgeGroup::range(self.num_groups())
            .map(|age| y[self.flat(age, Compartment::Infected)])
            .sum();
        let total: Real = y.sum();
        if total <= 0.0 {
            return 0.0;
        }
        infected / total
    }

    /// Elementwise multipliers applied to a migrating sub-population.
    ///
    /// One everywhere except the Infected cells, which are scaled by
    /// `risk(t) / max_risk`: departure screening loses effectiveness as
    /// test-and-trace saturates.
    pub fn get_migration_factors(&self, _t: Real, y: &DVector<Real>) -> DVector<Real> {
        let mut factors = DVector::from_element(self.num_elements(), 1.0);
        let required = self.test_and_trace_required(y);
        for age in AgeGroup::range(self.num_groups()) {
            let max_risk = self
                .parameters
                .max_risk_of_infection_from_symptomatic
                .get(age);
            if max_risk <= 0.0 {
                continue;
            }
            let risk = self.effective_symptomatic_risk(age, required);
            factors[self.flat(age, Compartment::Infected)] = risk / max_risk;
        }
        factors
    }

    /// All scalar leaves of the model in a stable order: the uncertain
    /// parameters, the start day, then the population cells. Read and
    /// write sides must stay in sync; parameter-percentile assembly
    /// depends on it.
    pub fn leaf_values(&self) -> Vec<Real> {
        let mut leaves: Vec<Real> = self
            .parameters
            .uncertain_values()
            .map(|v| v.value())
            .collect();
        leaves.push(self.parameters.start_day);
        leaves.extend(self.populations.cells().map(|c| c.value()));
        leaves
    }

    /// Overwrite all scalar leaves; `values` must come from `leaf_values`
    /// of a model with the same shape.
    pub fn set_leaf_values(&mut self, values: &[Real]) -> ModelResult<()> {
        let expected = self.leaf_values().len();
        if values.len() != expected {
            return Err(ModelError::DimensionMismatch {
                what: "model leaf values",
                expected,
                got: values.len(),
            });
        }
        let mut iter = values.iter().copied();
        for leaf in self.parameters.uncertain_values_mut() {
            leaf.set_value(iter.next().expect("length checked"));
        }
        self.parameters.start_day = iter.next().expect("length checked");
        for cell in self.populations.cells_mut() {
            cell.set_value(iter.next().expect("length checked"));
        }
        Ok(())
    }
}
