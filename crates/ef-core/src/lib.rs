//! ef-core: stable foundation for epiflow.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - index (typed categorical indices for age groups)
//! - date (calendar dates for holiday tables and the seasonality origin)
//! - time_series (append-only simulation output buffer)
//! - error (shared error types)

pub mod date;
pub mod error;
pub mod index;
pub mod numeric;
pub mod time_series;

// Re-exports: nice ergonomics for downstream crates
pub use date::Date;
pub use error::{CoreError, CoreResult};
pub use index::AgeGroup;
pub use numeric::*;
pub use time_series::TimeSeries;
