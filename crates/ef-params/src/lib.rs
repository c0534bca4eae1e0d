//! ef-params: parameter machinery shared by all epiflow models.
//!
//! Contains:
//! - uncertain (scalar values with optional sampling distributions)
//! - damping (time-stamped contact reductions)
//! - contact (baseline contact matrices + damping sequences)
//! - regions (administrative regions and embedded school-holiday tables)

pub mod contact;
pub mod damping;
pub mod error;
pub mod regions;
pub mod uncertain;

pub use contact::{ContactMatrix, ContactMatrixGroup};
pub use damping::{Damping, Dampings};
pub use error::{ParamsError, ParamsResult};
pub use regions::{get_holidays, get_holidays_in_range, get_state_id, CountyId, StateId};
pub use uncertain::{NormalDistribution, ParameterDistribution, UncertainValue, UniformDistribution};
