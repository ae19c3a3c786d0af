use serde::Serialize;

/// An edge connecting two commits, by index into the DAG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Source commit (child)
    pub from: usize,
    /// Target commit (parent)
    pub to: usize,
    pub edge_type: EdgeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Child to its first parent
    Regular,
    /// Child to any parent after the first
    Merge,
}

impl Edge {
    pub fn new(from: usize, to: usize, parent_index: usize) -> Self {
        let edge_type = if parent_index > 0 {
            EdgeType::Merge
        } else {
            EdgeType::Regular
        };
        Self { from, to, edge_type }
    }

    pub fn is_merge(&self) -> bool {
        self.edge_type == EdgeType::Merge
    }
}
