//! ef-sim: advancing a single SECIHURD node through time.

pub mod error;
pub mod simulation;

pub use error::{SimError, SimResult};
pub use simulation::{simulate, SamplingPolicy, Simulation};
