//! ef-study: uncertainty quantification over graph simulations.
//!
//! Contains:
//! - sampling (attaching distributions to a model and drawing samples)
//! - study (the embarrassingly parallel ensemble runner)

pub mod sampling;
pub mod study;

pub use sampling::{draw_sample, set_params_distributions_normal};
pub use study::{ParameterStudy, StudyRun};
