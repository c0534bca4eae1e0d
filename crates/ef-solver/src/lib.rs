//! ef-solver: adaptive embedded Runge-Kutta integration.
//!
//! Contains:
//! - cash_karp (the 5(4) embedded scheme with step-size control)
//! - error (solver error types)

pub mod cash_karp;
pub mod error;

pub use cash_karp::{CashKarp, StepControl, StepOutcome};
pub use error::{SolverError, SolverResult};
