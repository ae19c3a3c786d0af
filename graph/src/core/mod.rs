pub mod node;
pub mod edge;
pub mod dag;

pub use node::DagNode;
pub use edge::{Edge, EdgeType};
pub use dag::{Dag, DagStats};
