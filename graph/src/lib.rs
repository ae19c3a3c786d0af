pub mod core;
pub mod layout;

pub use core::{Dag, DagStats, Edge, EdgeType};
pub use layout::{
    apply_overlay, layout, layout_auxiliary, AuxItem, AuxNode, Direction, DisplaySettings,
    GraphEdge, GraphModel, GraphNode, LayoutCache, LayoutOptions, Position,
};
