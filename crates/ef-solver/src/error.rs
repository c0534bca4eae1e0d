use thiserror::Error;

pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Error, Debug)]
pub enum SolverError {
    /// The controller cannot make progress: the minimum step size still
    /// produces a non-finite state. Non-recoverable for the run.
    #[error("integrator stall at t = {t}: no finite step at dt_min = {dt_min}")]
    Stall { t: f64, dt_min: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
