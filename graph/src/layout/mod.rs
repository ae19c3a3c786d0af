pub mod auxiliary;
pub mod cache;
pub mod color;
pub mod engine;
pub mod layered;
pub mod options;

pub use auxiliary::{layout_auxiliary, AuxItem, AuxNode};
pub use cache::{highlight_set, LayoutCache};
pub use color::{AuthorColors, BranchColors, ColorStrategy};
pub use engine::{apply_overlay, layout, Bounds, GraphEdge, GraphModel, GraphNode, Position};
pub use options::{node_size, Direction, DisplaySettings, LayoutOptions, NodeSize};
