pub mod force_graph;
mod search;

pub use search::SearchPanel;
