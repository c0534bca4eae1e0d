//! ef-graph: the meta-population graph and its migration simulation.
//!
//! Contains:
//! - graph (generic nodes + sorted-edge storage)
//! - migration (the tick loop moving sub-populations along edges)
//! - error (graph error types)

pub mod error;
pub mod graph;
pub mod migration;

pub use error::{GraphError, GraphResult};
pub use graph::{Edge, Graph};
pub use migration::{
    DampingEvent, GraphSimulation, MigrationEdge, MigrationParameters, ModelNode, Traveller,
};
