//! The migration simulation: discrete population exchange between nodes
//! whose continuous dynamics run independently between ticks.

use ef_core::{clamp_unit, Date, Real, TimeSeries};
use ef_model::SecihurdModel;
use ef_params::regions::{get_holidays_in_range, StateId};
use ef_sim::Simulation;
use ef_solver::CashKarp;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

const TIME_EPS: Real = 1e-10;

/// A node of the study graph: a region id, its model and how long
/// visitors stay before returning home.
#[derive(Clone, Debug)]
pub struct ModelNode {
    pub region_id: u32,
    pub model: SecihurdModel,
    /// Residence interval of incoming travellers, in days.
    pub stay_duration: Real,
}

/// A node of the running simulation graph.
#[derive(Clone, Debug)]
pub struct SimulationNode {
    pub region_id: u32,
    pub simulation: Simulation,
    pub stay_duration: Real,
}

/// Per-edge migration coefficients: the fraction of each (age,
/// compartment) cell that leaves per tick, elementwise in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct MigrationParameters {
    pub coefficients: DVector<Real>,
}

impl MigrationParameters {
    pub fn new(coefficients: DVector<Real>) -> GraphResult<Self> {
        if !coefficients.iter().all(|&k| (0.0..=1.0).contains(&k)) {
            return Err(GraphError::InvalidArg {
                what: "migration coefficients must lie in [0, 1]",
            });
        }
        Ok(Self { coefficients })
    }

    /// The same fraction for every cell.
    pub fn from_constant(num_elements: usize, fraction: Real) -> GraphResult<Self> {
        Self::new(DVector::from_element(num_elements, fraction))
    }
}

/// A sub-population temporarily present at a non-home node.
///
/// Created at departure, integrated once under the destination's dynamics
/// for the residence interval, and returned to the origin in exact units
/// after `stay_duration` has elapsed. Return is pure bookkeeping.
#[derive(Clone, Debug)]
pub struct Traveller {
    pub values: DVector<Real>,
    pub departure: Real,
    integrated: bool,
}

/// Edge state: the static coefficients plus in-flight travellers.
#[derive(Clone, Debug)]
pub struct MigrationEdge {
    pub parameters: MigrationParameters,
    pub travellers: Vec<Traveller>,
}

/// A scheduled contact-matrix mutation, e.g. a holiday or lockdown
/// boundary. Applied at most once; re-application is a no-op.
#[derive(Clone, Debug)]
pub struct DampingEvent {
    pub time: Real,
    pub node_idx: usize,
    pub setting: usize,
    pub value: DMatrix<Real>,
    applied: bool,
}

impl DampingEvent {
    pub fn new(time: Real, node_idx: usize, setting: usize, value: DMatrix<Real>) -> Self {
        Self {
            time,
            node_idx,
            setting,
            value,
            applied: false,
        }
    }
}

/// Damping events for one node derived from a state's school holidays:
/// contacts are reduced by `strength` while a holiday period overlaps the
/// simulated window and restored afterwards.
pub fn holiday_damping_events(
    node_idx: usize,
    setting: usize,
    state: StateId,
    strength: Real,
    num_groups: usize,
    start_date: Date,
    end_date: Date,
) -> Vec<DampingEvent> {
    let strength = clamp_unit(strength);
    let on = DMatrix::from_element(num_groups, num_groups, strength);
    let off = DMatrix::from_element(num_groups, num_groups, -strength);
    let mut events = Vec::new();
    for &(begin, end) in get_holidays_in_range(state, start_date, end_date) {
        let t_on = start_date.days_until(begin).max(0) as Real;
        events.push(DampingEvent::new(t_on, node_idx, setting, on.clone()));
        let t_off = start_date.days_until(end) as Real;
        if t_off > start_date.days_until(end_date) as Real {
            continue;
        }
        events.push(DampingEvent::new(t_off, node_idx, setting, off.clone()));
    }
    events
}

/// Simulation of a node graph with discrete migration between nodes.
///
/// Per tick of length `dt`:
/// 1. every node integrates its own dynamics to the tick end,
/// 2. every edge departs `k (.) y (.) migration_factors` from its start
///    node and integrates the traveller under the destination's model for
///    the destination's `stay_duration`,
/// 3. travellers whose residence has elapsed return to their origin,
/// 4. due damping events mutate their node's contact patterns.
///
/// Travellers are stored in exact units, so the network-wide population
/// is conserved up to Dead accumulation inside node and traveller
/// dynamics.
#[derive(Clone, Debug)]
pub struct GraphSimulation {
    graph: Graph<SimulationNode, MigrationEdge>,
    t: Real,
    dt: Real,
    traveller_core: CashKarp,
    damping_events: Vec<DampingEvent>,
}

impl GraphSimulation {
    pub fn new(
        t0: Real,
        dt: Real,
        graph: Graph<ModelNode, MigrationParameters>,
    ) -> GraphResult<Self> {
        if !(dt > 0.0) {
            return Err(GraphError::InvalidArg {
                what: "migration tick must be positive",
            });
        }

        let num_elements: Vec<usize> = graph.nodes().iter().map(|n| n.model.num_elements()).collect();
        for edge in graph.edges() {
            let len = edge.property.coefficients.len();
            if len != num_elements[edge.start_node_idx] || len != num_elements[edge.end_node_idx] {
                return Err(GraphError::InvalidArg {
                    what: "edge coefficient length must match both endpoint state sizes",
                });
            }
        }

        let mut sim_graph: Graph<SimulationNode, MigrationEdge> = Graph::new();
        for node in graph.nodes() {
            if !(node.stay_duration >= 0.0) {
                return Err(GraphError::InvalidArg {
                    what: "stay duration must be non-negative",
                });
            }
            sim_graph.add_node(SimulationNode {
                region_id: node.region_id,
                simulation: Simulation::new(node.model.clone(), t0, dt)?,
                stay_duration: node.stay_duration,
            });
        }
        for edge in graph.edges() {
            sim_graph.add_edge(
                edge.start_node_idx,
                edge.end_node_idx,
                MigrationEdge {
                    parameters: edge.property.clone(),
                    travellers: Vec::new(),
                },
            )?;
        }

        Ok(Self {
            graph: sim_graph,
            t: t0,
            dt,
            traveller_core: CashKarp::default(),
            damping_events: Vec::new(),
        })
    }

    pub fn t(&self) -> Real {
        self.t
    }

    pub fn graph(&self) -> &Graph<SimulationNode, MigrationEdge> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph<SimulationNode, MigrationEdge> {
        &mut self.graph
    }

    pub fn schedule_damping(&mut self, event: DampingEvent) {
        self.damping_events.push(event);
    }

    /// Recorded time series of every node, in node order.
    pub fn results(&self) -> Vec<&TimeSeries> {
        self.graph
            .nodes()
            .iter()
            .map(|n| n.simulation.result())
            .collect()
    }

    /// Network-wide population including in-flight travellers.
    pub fn total_population(&self) -> Real {
        let node_sum: Real = self
            .graph
            .nodes()
            .iter()
            .map(|n| n.simulation.current_state().sum())
            .sum();
        let traveller_sum: Real = self
            .graph
            .edges()
            .iter()
            .flat_map(|e| e.property.travellers.iter())
            .map(|tr| tr.values.sum())
            .sum();
        node_sum + traveller_sum
    }

    /// Advance the whole network to `t_max` in ticks of `dt`.
    pub fn advance(&mut self, t_max: Real) -> GraphResult<()> {
        while self.t < t_max - TIME_EPS {
            let t_next = (self.t + self.dt).min(t_max);
            self.tick(t_next)?;
            self.t = t_next;
        }
        Ok(())
    }

    fn tick(&mut self, t_next: Real) -> GraphResult<()> {
        // 1. node dynamics; all nodes finish before any edge acts
        for node in self.graph.nodes_mut() {
            node.simulation.advance(t_next)?;
        }

        let (nodes, edges) = self.graph.parts_mut();

        // 2. departures: subtract the screened sub-population and file it
        for edge in edges.iter_mut() {
            let origin = &mut nodes[edge.start_node_idx];
            let factors = origin
                .simulation
                .model()
                .get_migration_factors(t_next, origin.simulation.current_state());
            let y = origin.simulation.current_state();
            let k = &edge.property.parameters.coefficients;
            let migrated = DVector::from_fn(y.len(), |i, _| k[i] * factors[i] * y[i]);
            origin.simulation.apply_state_delta(&(-&migrated));
            edge.property.travellers.push(Traveller {
                values: migrated,
                departure: t_next,
                integrated: false,
            });
        }

        // 3. destination dynamics for fresh travellers
        for edge in edges.iter_mut() {
            let destination = &nodes[edge.end_node_idx];
            let stay = destination.stay_duration;
            let model = destination.simulation.model();
            for traveller in edge.property.travellers.iter_mut() {
                if traveller.integrated {
                    continue;
                }
                traveller.integrated = true;
                if stay <= TIME_EPS || traveller.values.sum() <= 0.0 {
                    continue;
                }
                let mut rhs = |t: Real, y: &DVector<Real>, dydt: &mut DVector<Real>| {
                    model.get_derivatives(y, t, dydt);
                };
                let mut visit = TimeSeries::new(traveller.values.len());
                self.traveller_core.integrate(
                    &mut rhs,
                    traveller.departure,
                    &traveller.values,
                    stay,
                    traveller.departure + stay,
                    &mut visit,
                )?;
                traveller.values = visit.last_value().clone();
            }
        }

        // 4. returns: exact bookkeeping, no further dynamics
        for edge in edges.iter_mut() {
            let stay = nodes[edge.end_node_idx].stay_duration;
            let origin = &mut nodes[edge.start_node_idx];
            let mut returned = DVector::zeros(edge.property.parameters.coefficients.len());
            edge.property.travellers.retain(|traveller| {
                if t_next - traveller.departure >= stay - TIME_EPS && traveller.integrated {
                    returned += &traveller.values;
                    false
                } else {
                    true
                }
            });
            if returned.iter().any(|&v| v != 0.0) {
                origin.simulation.apply_state_delta(&returned);
            }
        }

        // 5. due damping events, each at most once
        for event in self.damping_events.iter_mut() {
            if event.applied || event.time > t_next {
                continue;
            }
            event.applied = true;
            debug!(time = event.time, node = event.node_idx, "applying damping event");
            let node = &mut self.graph.nodes_mut()[event.node_idx];
            node.simulation.model_mut().parameters.contact_patterns[event.setting]
                .add_damping(event.value.clone(), event.time);
        }

        Ok(())
    }
}
