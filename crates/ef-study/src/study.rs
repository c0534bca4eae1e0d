//! The ensemble runner: many independent graph simulations from
//! resampled parameters.

use ef_core::{Real, TimeSeries};
use ef_graph::{Graph, GraphSimulation, MigrationParameters, ModelNode};
use ef_model::SecihurdModel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{info, warn};

/// Output of one ensemble member: the per-node time series and the
/// parameters it actually ran with.
#[derive(Clone, Debug)]
pub struct StudyRun {
    pub run_idx: usize,
    pub results: Vec<TimeSeries>,
    pub models: Vec<SecihurdModel>,
}

/// An ensemble of graph simulations over sampled parameters.
///
/// Each run deep-copies the template graph, draws a fresh parameter
/// sample with its own `StdRng` seeded from `seed + run index`, and
/// simulates `[t0, tmax]` with migration tick `dt`. Runs share nothing
/// and are dispatched over the rayon thread pool. A failed run is logged
/// and dropped; the surviving runs keep their original indices.
#[derive(Clone, Debug)]
pub struct ParameterStudy {
    graph: Graph<ModelNode, MigrationParameters>,
    t0: Real,
    tmax: Real,
    dt: Real,
    num_runs: usize,
    seed: u64,
}

impl ParameterStudy {
    pub fn new(
        graph: Graph<ModelNode, MigrationParameters>,
        t0: Real,
        tmax: Real,
        dt: Real,
        num_runs: usize,
        seed: u64,
    ) -> Self {
        Self {
            graph,
            t0,
            tmax,
            dt,
            num_runs,
            seed,
        }
    }

    pub fn num_runs(&self) -> usize {
        self.num_runs
    }

    /// Run the ensemble, returning the surviving runs in index order.
    pub fn run(&self) -> Vec<StudyRun> {
        let runs: Vec<StudyRun> = (0..self.num_runs)
            .into_par_iter()
            .filter_map(|run_idx| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(run_idx as u64));
                let mut graph = self.graph.clone();
                for node in graph.nodes_mut() {
                    crate::sampling::draw_sample(&mut node.model, &mut rng);
                }
                let models: Vec<SecihurdModel> =
                    graph.nodes().iter().map(|n| n.model.clone()).collect();

                let mut sim = match GraphSimulation::new(self.t0, self.dt, graph) {
                    Ok(sim) => sim,
                    Err(error) => {
                        warn!(run_idx, %error, "dropping sample, graph setup failed");
                        return None;
                    }
                };
                if let Err(error) = sim.advance(self.tmax) {
                    warn!(run_idx, %error, "dropping sample, simulation failed");
                    return None;
                }

                let results = sim
                    .results()
                    .into_iter()
                    .cloned()
                    .collect();
                Some(StudyRun {
                    run_idx,
                    results,
                    models,
                })
            })
            .collect();

        let mut runs = runs;
        runs.sort_by_key(|run| run.run_idx);
        if runs.len() < self.num_runs {
            info!(
                requested = self.num_runs,
                completed = runs.len(),
                "ensemble finished with failed samples"
            );
        }
        runs
    }
}
