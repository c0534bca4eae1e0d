//! Behaviour of the SECIHURD right-hand side and model capabilities.

use ef_core::AgeGroup;
use ef_model::{Compartment, SecihurdModel};
use ef_params::ContactMatrix;
use nalgebra::DVector;

/// The canonical one-group outbreak setup used across the test suite.
fn single_group_model() -> SecihurdModel {
    let mut model = SecihurdModel::new(1);
    let age = AgeGroup(0);
    let p = &mut model.parameters;

    p.incubation_time[age].set_value(5.2);
    p.infectious_time_mild[age].set_value(6.0);
    p.serial_interval[age].set_value(4.2);
    p.hospitalized_to_home_time[age].set_value(12.0);
    p.home_to_hospitalized_time[age].set_value(5.0);
    p.hospitalized_to_icu_time[age].set_value(2.0);
    p.icu_to_home_time[age].set_value(8.0);
    p.icu_to_death_time[age].set_value(5.0);

    p.infection_probability_from_contact[age].set_value(0.05);
    p.relative_carrier_infectability[age].set_value(1.0);
    p.asymptomatic_cases_per_infectious[age].set_value(0.09);
    p.risk_of_infection_from_symptomatic[age].set_value(0.25);
    p.max_risk_of_infection_from_symptomatic[age].set_value(0.25);
    p.hospitalized_cases_per_infectious[age].set_value(0.2);
    p.icu_cases_per_hospitalized[age].set_value(0.25);
    p.deaths_per_hospitalized[age].set_value(0.3);

    p.contact_patterns[0] = ContactMatrix::from_constant(1, 10.0);

    let pop = &mut model.populations;
    pop.set(age, Compartment::Exposed, 100.0);
    pop.set(age, Compartment::Carrier, 50.0);
    pop.set(age, Compartment::Infected, 50.0);
    pop.set(age, Compartment::Hospitalized, 20.0);
    pop.set(age, Compartment::Icu, 10.0);
    pop.set(age, Compartment::Recovered, 10.0);
    pop.set(age, Compartment::Dead, 0.0);
    pop.set_difference_from_total(age, Compartment::Susceptible, 10_000.0);

    model.apply_constraints();
    model
}

fn derivatives(model: &SecihurdModel, y: &DVector<f64>, t: f64) -> DVector<f64> {
    let mut dydt = DVector::zeros(y.len());
    model.get_derivatives(y, t, &mut dydt);
    dydt
}

#[test]
fn rhs_conserves_total_mass() {
    let model = single_group_model();
    let y = model.populations.get_compartments();
    let dydt = derivatives(&model, &y, 0.0);
    assert!(dydt.sum().abs() < 1e-10, "net flow {}", dydt.sum());
}

#[test]
fn rhs_is_deterministic_and_pure() {
    let model = single_group_model();
    let y = model.populations.get_compartments();
    let a = derivatives(&model, &y, 17.5);
    let b = derivatives(&model, &y, 17.5);
    assert_eq!(a, b);
    // evaluating did not touch the stored populations
    assert_eq!(y, model.populations.get_compartments());
}

#[test]
fn saturated_test_and_trace_raises_exposure() {
    let model = single_group_model();
    let y = model.populations.get_compartments();
    let exposed = Compartment::Exposed.index();

    let dydt_default = derivatives(&model, &y, 0.0);

    // plenty of capacity: identical derivative despite the higher max risk
    let mut under = single_group_model();
    under
        .parameters
        .test_and_trace_capacity
        .set_value(50.0);
    under.parameters.max_risk_of_infection_from_symptomatic[AgeGroup(0)].set_value(0.75);
    let dydt_under = derivatives(&under, &y, 0.0);
    assert!((dydt_under[exposed] - dydt_default[exposed]).abs() < 1e-12);

    // saturated capacity: symptomatic risk interpolates up, more exposure
    let mut over = single_group_model();
    over.parameters.test_and_trace_capacity.set_value(10.0);
    over.parameters.max_risk_of_infection_from_symptomatic[AgeGroup(0)].set_value(0.75);
    let dydt_over = derivatives(&over, &y, 0.0);
    assert!(dydt_over[exposed] > dydt_default[exposed]);
}

#[test]
fn winter_start_raises_exposure_summer_lowers_it() {
    let mut model = single_group_model();
    model.parameters.seasonality.set_value(0.5);
    let y = model.populations.get_compartments();
    let exposed = Compartment::Exposed.index();

    model.parameters.start_day = 100.0;
    let summer = derivatives(&model, &y, 0.0);
    model.parameters.start_day = 280.0;
    let winter = derivatives(&model, &y, 0.0);
    model.parameters.seasonality.set_value(0.0);
    let flat = derivatives(&model, &y, 0.0);

    assert!(summer[exposed] < flat[exposed]);
    assert!(winter[exposed] > flat[exposed]);
}

#[test]
fn icu_overflow_is_redirected_to_dead() {
    let mut model = single_group_model();
    let age = AgeGroup(0);
    model.populations.set(age, Compartment::Hospitalized, 2000.0);
    model.populations.set(age, Compartment::Icu, 950.0);
    model.parameters.icu_capacity.set_value(1000.0);

    let y = model.populations.get_compartments();
    let dydt = derivatives(&model, &y, 0.0);

    let delta = 0.3;
    let ticu2death = 5.0;
    let baseline_deaths = delta * 950.0 / ticu2death;
    assert!(
        dydt[Compartment::Dead.index()] > baseline_deaths,
        "redirected admissions must show up as deaths"
    );
    // still conservative
    assert!(dydt.sum().abs() < 1e-10);

    // fully occupied: no ICU inflow at all
    model.populations.set(age, Compartment::Icu, 1000.0);
    let y_full = model.populations.get_compartments();
    let dydt_full = derivatives(&model, &y_full, 0.0);
    let ticu2home = 8.0;
    let outflow = 1000.0 * ((1.0 - delta) / ticu2home + delta / ticu2death);
    assert!((dydt_full[Compartment::Icu.index()] + outflow).abs() < 1e-10);
}

#[test]
fn infections_relative_aggregates_age_groups() {
    let mut model = SecihurdModel::new(3);
    model.populations.set(AgeGroup(0), Compartment::Infected, 100.0);
    model
        .populations
        .set_difference_from_group_total(AgeGroup(0), Compartment::Susceptible, 10_000.0);
    model.populations.set(AgeGroup(1), Compartment::Infected, 50.0);
    model
        .populations
        .set_difference_from_group_total(AgeGroup(1), Compartment::Susceptible, 20_000.0);
    model.populations.set(AgeGroup(2), Compartment::Infected, 25.0);
    model
        .populations
        .set_difference_from_group_total(AgeGroup(2), Compartment::Susceptible, 40_000.0);

    let y = model.populations.get_compartments();
    let relative = model.get_infections_relative(0.0, &y);
    assert!((relative - 175.0 / 70_000.0).abs() < 1e-15);
}

#[test]
fn migration_factors_scale_infected_with_screening_stress() {
    let mut model = SecihurdModel::new(1);
    let age = AgeGroup(0);
    model.parameters.incubation_time[age].set_value(5.0);
    model.parameters.serial_interval[age].set_value(4.0);
    model.parameters.asymptomatic_cases_per_infectious[age].set_value(0.1);
    model.parameters.risk_of_infection_from_symptomatic[age].set_value(0.25);
    model.parameters.max_risk_of_infection_from_symptomatic[age].set_value(0.5);
    model.populations.set(age, Compartment::Carrier, 100.0);
    let y = model.populations.get_compartments();
    // required detections: 100 * 0.9 / (4 - 2.5) = 60 per day

    // ample capacity: factor = risk / max_risk
    model.parameters.test_and_trace_capacity.set_value(120.0);
    let factors = model.get_migration_factors(0.0, &y);
    for (idx, factor) in factors.iter().enumerate() {
        if idx == Compartment::Infected.index() {
            assert!((factor - 0.5).abs() < 1e-12);
        } else {
            assert_eq!(*factor, 1.0);
        }
    }

    // deeply saturated: risk reaches max_risk, factor 1
    model.parameters.test_and_trace_capacity.set_value(5.0);
    let factors = model.get_migration_factors(0.0, &y);
    assert!((factors[Compartment::Infected.index()] - 1.0).abs() < 1e-12);

    // in between: strictly between the two
    model.parameters.test_and_trace_capacity.set_value(45.0);
    let factors = model.get_migration_factors(0.0, &y);
    let f = factors[Compartment::Infected.index()];
    assert!(f > 0.5 && f < 1.0, "factor {f}");
}

#[test]
fn leaf_round_trip_preserves_model() {
    let model = single_group_model();
    let leaves = model.leaf_values();

    let mut copy = single_group_model();
    copy.parameters.start_day = 123.0;
    copy.populations.set(AgeGroup(0), Compartment::Carrier, 1.0);
    copy.set_leaf_values(&leaves).unwrap();

    assert_eq!(copy.leaf_values(), leaves);
    assert_eq!(copy.parameters.start_day, model.parameters.start_day);

    // shape mismatch is a typed error
    let mut other = SecihurdModel::new(2);
    assert!(other.set_leaf_values(&leaves).is_err());
}
