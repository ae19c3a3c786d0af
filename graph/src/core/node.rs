use smallvec::SmallVec;

/// A commit node in the DAG. Relations are indices of other nodes; parents
/// outside the visible set are not represented.
#[derive(Debug, Clone, Default)]
pub struct DagNode {
    /// Parents present in the DAG, in parent order
    pub parents: SmallVec<[usize; 2]>,
    /// Position of each entry of `parents` in the commit's parent list
    pub parent_slots: SmallVec<[usize; 2]>,
    /// Children present in the DAG, in input order
    pub children: Vec<usize>,
}

impl DagNode {
    /// Check if this node has no visible parents
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Check if this node has no visible children
    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }

    /// Visible first parent, if the commit's first parent is in view
    pub fn first_parent(&self) -> Option<usize> {
        match (self.parents.first(), self.parent_slots.first()) {
            (Some(&p), Some(&0)) => Some(p),
            _ => None,
        }
    }
}
