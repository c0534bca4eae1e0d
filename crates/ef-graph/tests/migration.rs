//! Migration-loop behaviour: symmetry, conservation, traveller timing.

use ef_core::{AgeGroup, Date, Tolerances};
use ef_graph::{
    migration::holiday_damping_events, DampingEvent, Graph, GraphSimulation, MigrationParameters,
    ModelNode,
};
use ef_model::{Compartment, SecihurdModel};
use ef_params::{regions::StateId, ContactMatrix};
use nalgebra::DMatrix;

fn outbreak_model() -> SecihurdModel {
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
    pop.set_difference_from_total(age, Compartment::Susceptible, 10_000.0);
    model.apply_constraints();
    model
}

fn symmetric_two_node_graph(stay: f64) -> Graph<ModelNode, MigrationParameters> {
    let model = outbreak_model();
    let n = model.num_elements();
    let mut graph = Graph::new();
    graph.add_node(ModelNode {
        region_id: 1001,
        model: model.clone(),
        stay_duration: stay,
    });
    graph.add_node(ModelNode {
        region_id: 1002,
        model,
        stay_duration: stay,
    });
    let k = MigrationParameters::from_constant(n, 0.1).unwrap();
    graph.add_edge(0, 1, k.clone()).unwrap();
    graph.add_edge(1, 0, k).unwrap();
    graph
}

#[test]
fn symmetric_network_stays_symmetric() {
    let mut sim = GraphSimulation::new(0.0, 0.5, symmetric_two_node_graph(0.5)).unwrap();
    for day in 1..=5 {
        sim.advance(day as f64).unwrap();
        let nodes = sim.graph().nodes();
        let a = nodes[0].simulation.current_state();
        let b = nodes[1].simulation.current_state();
        for i in 0..a.len() {
            assert!(
                (a[i] - b[i]).abs() < 1e-8,
                "day {day}, element {i}: {} vs {}",
                a[i],
                b[i]
            );
        }
    }
}

#[test]
fn network_population_is_conserved() {
    let tol = Tolerances::conservation();
    let mut sim = GraphSimulation::new(0.0, 0.5, symmetric_two_node_graph(0.5)).unwrap();
    let initial = sim.total_population();
    for step in 1..=20 {
        sim.advance(step as f64 * 0.5).unwrap();
        let current = sim.total_population();
        assert!(
            tol.within(current, initial),
            "step {step}: {current} vs {initial}"
        );
    }
}

#[test]
fn travellers_return_after_their_stay() {
    let mut sim = GraphSimulation::new(0.0, 0.5, symmetric_two_node_graph(0.5)).unwrap();

    // after one tick, one traveller per edge is in flight
    sim.advance(0.5).unwrap();
    for edge in sim.graph().edges() {
        assert_eq!(edge.property.travellers.len(), 1);
    }

    // after the next tick, the residence interval has elapsed
    sim.advance(1.0).unwrap();
    for edge in sim.graph().edges() {
        assert_eq!(edge.property.travellers.len(), 1); // the newly departed batch
        assert!(edge.property.travellers[0].departure == 1.0);
    }
}

#[test]
fn states_stay_non_negative_everywhere() {
    let mut sim = GraphSimulation::new(0.0, 0.5, symmetric_two_node_graph(0.5)).unwrap();
    sim.advance(10.0).unwrap();
    for node in sim.graph().nodes() {
        let series = node.simulation.result();
        for (t, value) in series.iter() {
            for &v in value.iter() {
                assert!(v >= -1e-9, "negative state {v} at t = {t}");
            }
        }
    }
    for edge in sim.graph().edges() {
        for traveller in &edge.property.travellers {
            assert!(traveller.values.iter().all(|&v| v >= -1e-9));
        }
    }
}

#[test]
fn damping_events_apply_exactly_once() {
    let mut sim = GraphSimulation::new(0.0, 0.5, symmetric_two_node_graph(0.5)).unwrap();
    sim.schedule_damping(DampingEvent::new(
        1.0,
        0,
        0,
        DMatrix::from_element(1, 1, 0.7),
    ));
    sim.advance(3.0).unwrap();

    let contact = &sim.graph().nodes()[0]
        .simulation
        .model()
        .parameters
        .contact_patterns[0];
    assert_eq!(contact.dampings().entries().len(), 1);
    assert!((contact.effective_at(2.0)[(0, 0)] - 3.0).abs() < 1e-12);
    // the other node is untouched
    let other = &sim.graph().nodes()[1]
        .simulation
        .model()
        .parameters
        .contact_patterns[0];
    assert!(other.dampings().is_empty());
}

#[test]
fn holiday_events_cover_overlapping_periods() {
    let events = holiday_damping_events(
        0,
        0,
        StateId(9),
        0.3,
        1,
        Date::new(2020, 10, 15).unwrap(),
        Date::new(2020, 11, 15).unwrap(),
    );
    // Bavarian autumn break: damping on at day 16, lifted at day 23
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].time, 16.0);
    assert_eq!(events[0].value[(0, 0)], 0.3);
    assert_eq!(events[1].time, 23.0);
    assert_eq!(events[1].value[(0, 0)], -0.3);
}

#[test]
fn coefficient_validation() {
    assert!(MigrationParameters::from_constant(8, 1.5).is_err());
    assert!(MigrationParameters::from_constant(8, -0.1).is_err());
    assert!(MigrationParameters::from_constant(8, 0.0).is_ok());
}
