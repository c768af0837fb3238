//! Dataset-backed graph exploration: lazy one-hop expansion and cascading
//! collapse over the visible working set.

mod adjacency;
mod store;

pub use adjacency::{AdjacencySource, DataError, RelationRecord};
pub use store::{EntityNode, GraphView, RelationEdge, VisibleGraph};
