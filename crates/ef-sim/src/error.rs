//! Error types for simulation runs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Solver(#[from] ef_solver::SolverError),

    #[error(transparent)]
    Model(#[from] ef_model::ModelError),
}

pub type SimResult<T> = Result<T, SimError>;
