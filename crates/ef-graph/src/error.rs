use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node index out of bounds: {index} (graph has {len} nodes)")]
    NodeOob { index: usize, len: usize },

    #[error("Self-loop edges are not allowed (node {index})")]
    SelfLoop { index: usize },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Sim(#[from] ef_sim::SimError),

    #[error(transparent)]
    Solver(#[from] ef_solver::SolverError),
}
