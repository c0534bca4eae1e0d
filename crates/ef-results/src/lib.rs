//! ef-results: reducing and persisting simulation output.
//!
//! Contains:
//! - analyze (daily interpolation, node sums, ensemble statistics)
//! - schema (serde representation of parameter trees and graphs)
//! - io (reading/writing parameter trees, graphs and time-series tables)
//! - error (typed IO and analysis errors)

pub mod analyze;
pub mod error;
pub mod io;
pub mod schema;

pub use analyze::{
    ensemble_mean, ensemble_params_percentile, ensemble_percentile,
    interpolate_simulation_result, result_distance_2norm, result_distance_2norm_compartment,
    sum_nodes,
};
pub use error::{ResultsError, ResultsResult};
