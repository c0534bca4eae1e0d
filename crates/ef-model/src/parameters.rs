//! The typed parameter store of the SECIHURD model.

use std::ops::{Index, IndexMut};

use ef_core::{AgeGroup, Real};
use ef_params::{ContactMatrixGroup, UncertainValue};
use tracing::warn;

use crate::error::{ModelError, ModelResult};

/// An age-resolved parameter series, one `UncertainValue` per age group.
#[derive(Clone, Debug, PartialEq)]
pub struct AgeParam(Vec<UncertainValue>);

impl AgeParam {
    pub fn filled(value: Real, num_groups: usize) -> Self {
        Self(vec![UncertainValue::new(value); num_groups])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, age: AgeGroup) -> Real {
        self.0[age.get()].value()
    }

    pub fn set_all(&mut self, value: Real) {
        for cell in &mut self.0 {
            cell.set_value(value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &UncertainValue> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut UncertainValue> {
        self.0.iter_mut()
    }
}

impl Index<AgeGroup> for AgeParam {
    type Output = UncertainValue;

    fn index(&self, age: AgeGroup) -> &UncertainValue {
        &self.0[age.get()]
    }
}

impl IndexMut<AgeGroup> for AgeParam {
    fn index_mut(&mut self, age: AgeGroup) -> &mut UncertainValue {
        &mut self.0[age.get()]
    }
}

/// All model parameters: age-resolved epidemiological times and
/// probabilities, global capacities, the seasonality modulation, and the
/// contact patterns.
///
/// Time parameters are in days; probabilities are dimensionless. The
/// orchestrator mutates the store only between simulation steps, never
/// from inside the right-hand side.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    num_groups: usize,

    // stage durations (days)
    pub incubation_time: AgeParam,
    pub infectious_time_mild: AgeParam,
    pub infectious_time_asymptomatic: AgeParam,
    pub serial_interval: AgeParam,
    pub hospitalized_to_home_time: AgeParam,
    pub home_to_hospitalized_time: AgeParam,
    pub hospitalized_to_icu_time: AgeParam,
    pub icu_to_home_time: AgeParam,
    pub icu_to_death_time: AgeParam,

    // transition probabilities
    pub infection_probability_from_contact: AgeParam,
    pub relative_carrier_infectability: AgeParam,
    pub asymptomatic_cases_per_infectious: AgeParam,
    pub risk_of_infection_from_symptomatic: AgeParam,
    pub max_risk_of_infection_from_symptomatic: AgeParam,
    pub hospitalized_cases_per_infectious: AgeParam,
    pub icu_cases_per_hospitalized: AgeParam,
    pub deaths_per_hospitalized: AgeParam,

    // global scalars
    pub icu_capacity: UncertainValue,
    pub test_and_trace_capacity: UncertainValue,
    pub seasonality: UncertainValue,
    /// Day of the year the simulation starts at (t = 0).
    pub start_day: Real,

    pub contact_patterns: ContactMatrixGroup,
}

impl Parameters {
    pub fn new(num_groups: usize) -> Self {
        Self {
            num_groups,
            incubation_time: AgeParam::filled(5.2, num_groups),
            infectious_time_mild: AgeParam::filled(6.0, num_groups),
            infectious_time_asymptomatic: AgeParam::filled(6.0, num_groups),
            serial_interval: AgeParam::filled(4.2, num_groups),
            hospitalized_to_home_time: AgeParam::filled(12.0, num_groups),
            home_to_hospitalized_time: AgeParam::filled(5.0, num_groups),
            hospitalized_to_icu_time: AgeParam::filled(2.0, num_groups),
            icu_to_home_time: AgeParam::filled(8.0, num_groups),
            icu_to_death_time: AgeParam::filled(5.0, num_groups),
            infection_probability_from_contact: AgeParam::filled(0.0, num_groups),
            relative_carrier_infectability: AgeParam::filled(1.0, num_groups),
            asymptomatic_cases_per_infectious: AgeParam::filled(0.0, num_groups),
            risk_of_infection_from_symptomatic: AgeParam::filled(0.0, num_groups),
            max_risk_of_infection_from_symptomatic: AgeParam::filled(0.0, num_groups),
            hospitalized_cases_per_infectious: AgeParam::filled(0.0, num_groups),
            icu_cases_per_hospitalized: AgeParam::filled(0.0, num_groups),
            deaths_per_hospitalized: AgeParam::filled(0.0, num_groups),
            icu_capacity: UncertainValue::new(Real::MAX),
            test_and_trace_capacity: UncertainValue::new(Real::MAX),
            seasonality: UncertainValue::new(0.0),
            start_day: 0.0,
            contact_patterns: ContactMatrixGroup::new(1, num_groups),
        }
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    /// Clamp out-of-range values to safe ones, logging each correction.
    pub fn apply_constraints(&mut self) {
        for age in AgeGroup::range(self.num_groups) {
            // incubation needs >= 2 so the serial interval bounds below stay ordered
            let incubation = self.incubation_time.get(age);
            if !(incubation >= 2.0) {
                warn!(%age, incubation, "incubation time below 2 days, resetting to 2");
                self.incubation_time[age].set_value(2.0);
            }

            for (name, series) in [
                ("InfectiousTimeMild", &mut self.infectious_time_mild),
                (
                    "InfectiousTimeAsymptomatic",
                    &mut self.infectious_time_asymptomatic,
                ),
                (
                    "HospitalizedToHomeTime",
                    &mut self.hospitalized_to_home_time,
                ),
                (
                    "HomeToHospitalizedTime",
                    &mut self.home_to_hospitalized_time,
                ),
                (
                    "HospitalizedToIcuTime",
                    &mut self.hospitalized_to_icu_time,
                ),
                ("IcuToHomeTime", &mut self.icu_to_home_time),
                ("IcuToDeathTime", &mut self.icu_to_death_time),
            ] {
                let value = series.get(age);
                if !(value > 0.0) || !value.is_finite() {
                    warn!(%age, name, value, "time parameter must be positive, resetting to 1");
                    series[age].set_value(1.0);
                }
            }

            // keep the carrier outflow divisor serial - incubation/2 >= 0.5
            let incubation = self.incubation_time.get(age);
            let lower = 0.5 * incubation + 0.5;
            let upper = incubation - 0.5;
            let serial = self.serial_interval.get(age);
            if serial < lower {
                warn!(%age, serial, lower, "serial interval below lower bound, clamping");
                self.serial_interval[age].set_value(lower);
            } else if serial > upper {
                warn!(%age, serial, upper, "serial interval above upper bound, clamping");
                self.serial_interval[age].set_value(upper);
            }

            for (name, series) in [
                (
                    "InfectionProbabilityFromContact",
                    &mut self.infection_probability_from_contact,
                ),
                (
                    "RelativeCarrierInfectability",
                    &mut self.relative_carrier_infectability,
                ),
                (
                    "AsymptomaticCasesPerInfectious",
                    &mut self.asymptomatic_cases_per_infectious,
                ),
                (
                    "RiskOfInfectionFromSymptomatic",
                    &mut self.risk_of_infection_from_symptomatic,
                ),
                (
                    "HospitalizedCasesPerInfectious",
                    &mut self.hospitalized_cases_per_infectious,
                ),
                ("IcuCasesPerHospitalized", &mut self.icu_cases_per_hospitalized),
                ("DeathsPerHospitalized", &mut self.deaths_per_hospitalized),
            ] {
                let value = series.get(age);
                if !(0.0..=1.0).contains(&value) {
                    warn!(%age, name, value, "probability out of [0, 1], resetting to 0");
                    series[age].set_value(0.0);
                }
            }

            let risk = self.risk_of_infection_from_symptomatic.get(age);
            let max_risk = self.max_risk_of_infection_from_symptomatic.get(age);
            if !(risk..=1.0).contains(&max_risk) {
                let clamped = max_risk.clamp(risk, 1.0);
                warn!(%age, risk, max_risk, clamped, "max risk out of [risk, 1], clamping");
                self.max_risk_of_infection_from_symptomatic[age].set_value(clamped);
            }
        }

        if self.icu_capacity.value() < 0.0 {
            warn!("negative ICU capacity, resetting to 0");
            self.icu_capacity.set_value(0.0);
        }
        if self.test_and_trace_capacity.value() < 0.0 {
            warn!("negative test-and-trace capacity, resetting to 0");
            self.test_and_trace_capacity.set_value(0.0);
        }
        let seasonality = self.seasonality.value();
        if !(0.0..=0.5).contains(&seasonality) {
            let clamped = seasonality.clamp(0.0, 0.5);
            warn!(seasonality, clamped, "seasonality out of [0, 0.5], clamping");
            self.seasonality.set_value(clamped);
        }
    }

    /// Read-only constraint check; reports the first violation.
    pub fn check_constraints(&self) -> ModelResult<()> {
        for age in AgeGroup::range(self.num_groups) {
            for (name, series) in [
                ("IncubationTime", &self.incubation_time),
                ("InfectiousTimeMild", &self.infectious_time_mild),
                (
                    "InfectiousTimeAsymptomatic",
                    &self.infectious_time_asymptomatic,
                ),
                ("SerialInterval", &self.serial_interval),
                ("HospitalizedToHomeTime", &self.hospitalized_to_home_time),
                ("HomeToHospitalizedTime", &self.home_to_hospitalized_time),
                ("HospitalizedToIcuTime", &self.hospitalized_to_icu_time),
                ("IcuToHomeTime", &self.icu_to_home_time),
                ("IcuToDeathTime", &self.icu_to_death_time),
            ] {
                let value = series.get(age);
                if !(value > 0.0) || !value.is_finite() {
                    return Err(ModelError::InvalidParameter {
                        what: format!("{name}[{age}] must be a positive time, got {value}"),
                    });
                }
            }

            let incubation = self.incubation_time.get(age);
            let serial = self.serial_interval.get(age);
            if serial < 0.5 * incubation + 0.5 {
                return Err(ModelError::InvalidParameter {
                    what: format!(
                        "SerialInterval[{age}] = {serial} too close to half the incubation \
                         time {incubation} (carrier outflow rate would be singular)"
                    ),
                });
            }
            if serial > incubation - 0.5 {
                return Err(ModelError::InvalidParameter {
                    what: format!(
                        "SerialInterval[{age}] = {serial} too close to the incubation time \
                         {incubation}"
                    ),
                });
            }

            for (name, series) in [
                (
                    "InfectionProbabilityFromContact",
                    &self.infection_probability_from_contact,
                ),
                (
                    "RelativeCarrierInfectability",
                    &self.relative_carrier_infectability,
                ),
                (
                    "AsymptomaticCasesPerInfectious",
                    &self.asymptomatic_cases_per_infectious,
                ),
                (
                    "RiskOfInfectionFromSymptomatic",
                    &self.risk_of_infection_from_symptomatic,
                ),
                (
                    "HospitalizedCasesPerInfectious",
                    &self.hospitalized_cases_per_infectious,
                ),
                ("IcuCasesPerHospitalized", &self.icu_cases_per_hospitalized),
                ("DeathsPerHospitalized", &self.deaths_per_hospitalized),
            ] {
                let value = series.get(age);
                if !(0.0..=1.0).contains(&value) {
                    return Err(ModelError::InvalidParameter {
                        what: format!("{name}[{age}] must be a probability, got {value}"),
                    });
                }
            }

            let risk = self.risk_of_infection_from_symptomatic.get(age);
            let max_risk = self.max_risk_of_infection_from_symptomatic.get(age);
            if !(risk..=1.0).contains(&max_risk) {
                return Err(ModelError::InvalidParameter {
                    what: format!(
                        "MaxRiskOfInfectionFromSymptomatic[{age}] = {max_risk} must lie in \
                         [RiskOfInfectionFromSymptomatic, 1] = [{risk}, 1]"
                    ),
                });
            }
        }

        if self.icu_capacity.value() < 0.0 {
            return Err(ModelError::InvalidParameter {
                what: "IcuCapacity must be non-negative".to_string(),
            });
        }
        if self.test_and_trace_capacity.value() < 0.0 {
            return Err(ModelError::InvalidParameter {
                what: "TestAndTraceCapacity must be non-negative".to_string(),
            });
        }
        let seasonality = self.seasonality.value();
        if !(0.0..=0.5).contains(&seasonality) {
            return Err(ModelError::InvalidParameter {
                what: format!("Seasonality must be in [0, 0.5], got {seasonality}"),
            });
        }

        Ok(())
    }

    /// All uncertain scalar leaves in declaration order (start day and
    /// contact patterns excluded). The order is the contract for
    /// parameter-percentile assembly.
    pub fn uncertain_values(&self) -> impl Iterator<Item = &UncertainValue> {
        self.age_params()
            .into_iter()
            .flat_map(|series| series.iter())
            .chain([
                &self.icu_capacity,
                &self.test_and_trace_capacity,
                &self.seasonality,
            ])
    }

    pub fn uncertain_values_mut(&mut self) -> Vec<&mut UncertainValue> {
        let Parameters {
            incubation_time,
            infectious_time_mild,
            infectious_time_asymptomatic,
            serial_interval,
            hospitalized_to_home_time,
            home_to_hospitalized_time,
            hospitalized_to_icu_time,
            icu_to_home_time,
            icu_to_death_time,
            infection_probability_from_contact,
            relative_carrier_infectability,
            asymptomatic_cases_per_infectious,
            risk_of_infection_from_symptomatic,
            max_risk_of_infection_from_symptomatic,
            hospitalized_cases_per_infectious,
            icu_cases_per_hospitalized,
            deaths_per_hospitalized,
            icu_capacity,
            test_and_trace_capacity,
            seasonality,
            ..
        } = self;

        let mut leaves: Vec<&mut UncertainValue> = Vec::new();
        for series in [
            incubation_time,
            infectious_time_mild,
            infectious_time_asymptomatic,
            serial_interval,
            hospitalized_to_home_time,
            home_to_hospitalized_time,
            hospitalized_to_icu_time,
            icu_to_home_time,
            icu_to_death_time,
            infection_probability_from_contact,
            relative_carrier_infectability,
            asymptomatic_cases_per_infectious,
            risk_of_infection_from_symptomatic,
            max_risk_of_infection_from_symptomatic,
            hospitalized_cases_per_infectious,
            icu_cases_per_hospitalized,
            deaths_per_hospitalized,
        ] {
            leaves.extend(series.iter_mut());
        }
        leaves.push(icu_capacity);
        leaves.push(test_and_trace_capacity);
        leaves.push(seasonality);
        leaves
    }

    pub(crate) fn age_params(&self) -> [&AgeParam; 17] {
        [
            &self.incubation_time,
            &self.infectious_time_mild,
            &self.infectious_time_asymptomatic,
            &self.serial_interval,
            &self.hospitalized_to_home_time,
            &self.home_to_hospitalized_time,
            &self.hospitalized_to_icu_time,
            &self.icu_to_home_time,
            &self.icu_to_death_time,
            &self.infection_probability_from_contact,
            &self.relative_carrier_infectability,
            &self.asymptomatic_cases_per_infectious,
            &self.risk_of_infection_from_symptomatic,
            &self.max_risk_of_infection_from_symptomatic,
            &self.hospitalized_cases_per_infectious,
            &self.icu_cases_per_hospitalized,
            &self.deaths_per_hospitalized,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_interval_is_clamped_against_incubation() {
        let mut params = Parameters::new(1);
        let age = AgeGroup(0);
        params.incubation_time[age].set_value(5.1);
        params.serial_interval[age].set_value(5.08993);
        assert!(params.check_constraints().is_err());

        params.apply_constraints();
        assert!((params.serial_interval.get(age) - 4.6).abs() < 1e-14);
        assert!(params.check_constraints().is_ok());
    }

    #[test]
    fn out_of_range_probability_resets_to_zero() {
        let mut params = Parameters::new(1);
        let age = AgeGroup(0);
        params.asymptomatic_cases_per_infectious[age].set_value(2.124921);
        assert!(params.check_constraints().is_err());

        params.apply_constraints();
        assert_eq!(params.asymptomatic_cases_per_infectious.get(age), 0.0);
    }

    #[test]
    fn max_risk_is_raised_to_risk() {
        let mut params = Parameters::new(1);
        let age = AgeGroup(0);
        params.risk_of_infection_from_symptomatic[age].set_value(0.25);
        params.max_risk_of_infection_from_symptomatic[age].set_value(0.1);
        params.apply_constraints();
        assert_eq!(
            params.max_risk_of_infection_from_symptomatic.get(age),
            0.25
        );
    }

    #[test]
    fn singular_carrier_outflow_is_an_error() {
        let mut params = Parameters::new(1);
        let age = AgeGroup(0);
        params.incubation_time[age].set_value(5.0);
        params.serial_interval[age].set_value(2.5);
        let err = params.check_constraints().unwrap_err();
        assert!(format!("{err}").contains("SerialInterval"));
    }

    #[test]
    fn negative_time_is_reset() {
        let mut params = Parameters::new(1);
        let age = AgeGroup(0);
        params.infectious_time_mild[age].set_value(-3.0);
        params.apply_constraints();
        assert_eq!(params.infectious_time_mild.get(age), 1.0);
    }

    #[test]
    fn leaf_iteration_covers_all_age_series_and_globals() {
        let mut params = Parameters::new(3);
        let immutable = params.uncertain_values().count();
        let mutable = params.uncertain_values_mut().len();
        assert_eq!(immutable, 17 * 3 + 3);
        assert_eq!(immutable, mutable);
    }
}
