use super::{edge::Edge, node::DagNode};
use gitgraph_core::Commit;
use std::collections::{HashMap, VecDeque};

/// Directed acyclic graph over a visible commit list.
///
/// Node `i` corresponds to `commits[i]` of the slice it was built from.
/// Edges point from child to parent and only exist when both ends are visible.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    pub nodes: Vec<DagNode>,
    pub edges: Vec<Edge>,
    /// Quick lookup: commit hash -> node index
    pub index: HashMap<String, usize>,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the DAG, silently dropping parents that are not in `commits`
    pub fn from_commits(commits: &[Commit]) -> Self {
        let mut index = HashMap::with_capacity(commits.len());
        for (i, commit) in commits.iter().enumerate() {
            index.entry(commit.hash.clone()).or_insert(i);
        }

        let mut nodes = vec![DagNode::default(); commits.len()];
        let mut edges = Vec::new();

        for (child, commit) in commits.iter().enumerate() {
            for (slot, parent_hash) in commit.parents.iter().enumerate() {
                let Some(&parent) = index.get(parent_hash) else {
                    continue;
                };
                if parent == child {
                    continue;
                }
                edges.push(Edge::new(child, parent, slot));
                nodes[child].parents.push(parent);
                nodes[child].parent_slots.push(slot);
                nodes[parent].children.push(child);
            }
        }

        Self { nodes, edges, index }
    }

    /// Get all root nodes (no visible parents)
    pub fn roots(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&i| self.nodes[i].is_root()).collect()
    }

    /// Get all tip nodes (no visible children)
    pub fn tips(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&i| self.nodes[i].is_tip()).collect()
    }

    /// Count of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Count of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Children-before-parents order. Ties are broken by input index so the
    /// result only depends on the input. Nodes caught in a cycle (malformed
    /// input) are appended in index order.
    pub fn topo_order(&self) -> Vec<usize> {
        let mut pending_children: Vec<usize> = self.nodes.iter().map(|n| n.children.len()).collect();
        let mut queue: VecDeque<usize> = self.tips().into();
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut placed = vec![false; self.nodes.len()];

        while let Some(v) = queue.pop_front() {
            placed[v] = true;
            order.push(v);
            for &p in &self.nodes[v].parents {
                pending_children[p] -= 1;
                if pending_children[p] == 0 {
                    queue.push_back(p);
                }
            }
        }

        if order.len() < self.nodes.len() {
            order.extend((0..self.nodes.len()).filter(|&i| !placed[i]));
        }
        order
    }

    /// Get statistics about the DAG
    pub fn stats(&self) -> DagStats {
        DagStats {
            total_commits: self.nodes.len(),
            total_edges: self.edges.len(),
            merge_commits: self.nodes.iter().filter(|n| n.parents.len() > 1).count(),
            root_commits: self.roots().len(),
            tip_commits: self.tips().len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagStats {
    pub total_commits: usize,
    pub total_edges: usize,
    pub merge_commits: usize,
    pub root_commits: usize,
    pub tip_commits: usize,
}
