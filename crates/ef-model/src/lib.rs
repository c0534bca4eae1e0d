//! ef-model: the age-stratified SECIHURD compartment model.
//!
//! Contains:
//! - compartments (the eight infection states)
//! - populations (the dense age x compartment cube)
//! - parameters (the typed parameter store incl. contact patterns)
//! - model (the right-hand side and the capabilities consumed by the
//!   meta-population graph)

pub mod compartments;
pub mod error;
pub mod model;
pub mod parameters;
pub mod populations;

pub use compartments::{Compartment, COMPARTMENTS, NUM_COMPARTMENTS};
pub use error::{ModelError, ModelResult};
pub use model::SecihurdModel;
pub use parameters::{AgeParam, Parameters};
pub use populations::Populations;
