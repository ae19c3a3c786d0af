//! Layered (Sugiyama style) placement of a commit DAG.
//!
//! 1. ranks: longest path from the tips, then nodes with more parents than
//!    children are pulled down next to their parents
//! 2. edges spanning several ranks get one dummy node per skipped rank
//! 3. barycenter sweeps reorder each rank, keeping the ordering with the
//!    fewest crossings seen
//! 4. coordinates: neighbours pull nodes toward their barycenter while
//!    order and minimum separation within the rank are kept

use crate::core::Dag;
use crate::layout::options::{Direction, NodeSize};

const ORDER_SWEEPS: usize = 8;
const COORDINATE_PASSES: usize = 4;

/// Center of a node as computed by the layered layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rank: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Spacing {
    pub node: f64,
    pub rank: f64,
}

/// Assign ranks so that every child sits above each of its parents
pub fn assign_ranks(dag: &Dag) -> Vec<usize> {
    let order = dag.topo_order();
    let mut rank = vec![0usize; dag.node_count()];

    for &v in &order {
        rank[v] = dag.nodes[v]
            .children
            .iter()
            .map(|&c| rank[c] + 1)
            .max()
            .unwrap_or(0);
    }

    // Parents before children: moving a node down never breaks its children
    for &v in order.iter().rev() {
        let node = &dag.nodes[v];
        if node.parents.len() <= node.children.len() {
            continue;
        }
        if let Some(lowest) = node.parents.iter().map(|&p| rank[p]).min() {
            if lowest > rank[v] + 1 {
                rank[v] = lowest - 1;
            }
        }
    }

    rank
}

/// Proper layered graph: real nodes keep their DAG index, dummies follow
struct LayerGraph {
    real_count: usize,
    up: Vec<Vec<usize>>,
    down: Vec<Vec<usize>>,
    layers: Vec<Vec<usize>>,
}

impl LayerGraph {
    fn build(dag: &Dag, ranks: &[usize]) -> Self {
        let real_count = dag.node_count();
        let rank_count = ranks.iter().copied().max().map_or(0, |r| r + 1);
        let mut up = vec![Vec::new(); real_count];
        let mut down = vec![Vec::new(); real_count];
        let mut layers = vec![Vec::new(); rank_count];

        for v in 0..real_count {
            layers[ranks[v]].push(v);
        }

        for edge in &dag.edges {
            let (from, to) = (edge.from, edge.to);
            // Only possible for cyclic input
            if ranks[from] >= ranks[to] {
                continue;
            }

            let mut prev = from;
            for r in ranks[from] + 1..ranks[to] {
                let dummy = up.len();
                up.push(vec![prev]);
                down.push(Vec::new());
                down[prev].push(dummy);
                layers[r].push(dummy);
                prev = dummy;
            }
            down[prev].push(to);
            up[to].push(prev);
        }

        Self {
            real_count,
            up,
            down,
            layers,
        }
    }

    fn is_real(&self, v: usize) -> bool {
        v < self.real_count
    }

    fn positions(&self) -> Vec<usize> {
        let mut pos = vec![0; self.up.len()];
        for layer in &self.layers {
            for (i, &v) in layer.iter().enumerate() {
                pos[v] = i;
            }
        }
        pos
    }

    /// Crossings between rank `r` and rank `r + 1`
    fn crossings_between(&self, r: usize, pos: &[usize]) -> usize {
        let lower_len = self.layers[r + 1].len();
        let mut pairs: Vec<(usize, usize)> = self.layers[r]
            .iter()
            .flat_map(|&u| self.down[u].iter().map(move |&w| (pos[u], pos[w])))
            .collect();
        pairs.sort_unstable();

        // Inversions among lower endpoints, counted with a Fenwick tree
        let mut tree = vec![0usize; lower_len + 1];
        let mut crossings = 0;
        for (inserted, &(_, lower)) in pairs.iter().enumerate() {
            let mut i = lower + 1;
            let mut not_greater = 0;
            while i > 0 {
                not_greater += tree[i];
                i &= i - 1;
            }
            crossings += inserted - not_greater;

            let mut i = lower + 1;
            while i <= lower_len {
                tree[i] += 1;
                i += i & i.wrapping_neg();
            }
        }
        crossings
    }

    fn total_crossings(&self) -> usize {
        let pos = self.positions();
        (0..self.layers.len().saturating_sub(1))
            .map(|r| self.crossings_between(r, &pos))
            .sum()
    }

    /// Sort rank `r` by the barycenter of its neighbours in the fixed rank
    fn reorder(&mut self, r: usize, use_up: bool, pos: &mut [usize]) {
        let neighbours = if use_up { &self.up } else { &self.down };
        let mut keyed: Vec<(f64, usize, usize)> = self.layers[r]
            .iter()
            .map(|&v| {
                let adj = &neighbours[v];
                let bary = if adj.is_empty() {
                    pos[v] as f64
                } else {
                    adj.iter().map(|&w| pos[w] as f64).sum::<f64>() / adj.len() as f64
                };
                (bary, pos[v], v)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        self.layers[r] = keyed.into_iter().map(|(_, _, v)| v).collect();
        for (i, &v) in self.layers[r].iter().enumerate() {
            pos[v] = i;
        }
    }

    fn reduce_crossings(&mut self) {
        let rank_count = self.layers.len();
        if rank_count < 2 {
            return;
        }

        let mut best = self.layers.clone();
        let mut best_crossings = self.total_crossings();
        for sweep in 0..ORDER_SWEEPS {
            if best_crossings == 0 {
                break;
            }
            let mut pos = self.positions();
            if sweep % 2 == 0 {
                for r in 1..rank_count {
                    self.reorder(r, true, &mut pos);
                }
            } else {
                for r in (0..rank_count - 1).rev() {
                    self.reorder(r, false, &mut pos);
                }
            }

            let crossings = self.total_crossings();
            if crossings < best_crossings {
                best_crossings = crossings;
                best = self.layers.clone();
            }
        }
        self.layers = best;
    }

    /// Coordinate of every layered node along the rank axis
    fn breadth_coordinates(&self, breadth: f64, spacing: f64) -> Vec<f64> {
        let extent = |v: usize| if self.is_real(v) { breadth } else { 0.0 };
        let separation = |a: usize, b: usize| {
            let gap = if self.is_real(a) && self.is_real(b) {
                spacing
            } else {
                spacing / 2.0
            };
            (extent(a) + extent(b)) / 2.0 + gap
        };

        let mut x = vec![0.0; self.up.len()];
        for layer in &self.layers {
            let mut cursor = 0.0;
            for (i, &v) in layer.iter().enumerate() {
                if i > 0 {
                    cursor += separation(layer[i - 1], v);
                }
                x[v] = cursor;
            }
            let mid = cursor / 2.0;
            for &v in layer {
                x[v] -= mid;
            }
        }

        let rank_count = self.layers.len();
        for pass in 0..COORDINATE_PASSES {
            let (ranks, neighbours): (Vec<usize>, &Vec<Vec<usize>>) = if pass % 2 == 0 {
                ((1..rank_count).collect(), &self.up)
            } else {
                ((0..rank_count.saturating_sub(1)).rev().collect(), &self.down)
            };

            for r in ranks {
                let layer = &self.layers[r];
                if layer.is_empty() {
                    continue;
                }
                let desired: Vec<f64> = layer
                    .iter()
                    .map(|&v| {
                        let adj = &neighbours[v];
                        if adj.is_empty() {
                            x[v]
                        } else {
                            adj.iter().map(|&w| x[w]).sum::<f64>() / adj.len() as f64
                        }
                    })
                    .collect();

                // Packing from each side keeps order and separation; so does their mean
                let n = layer.len();
                let mut left = desired.clone();
                for i in 1..n {
                    left[i] = left[i].max(left[i - 1] + separation(layer[i - 1], layer[i]));
                }
                let mut right = desired;
                for i in (0..n - 1).rev() {
                    right[i] = right[i].min(right[i + 1] - separation(layer[i], layer[i + 1]));
                }
                for i in 0..n {
                    x[layer[i]] = (left[i] + right[i]) / 2.0;
                }
            }
        }

        x
    }
}

/// Place every DAG node. Returned centers are normalized so that the
/// outermost node boxes touch x = 0 and y = 0.
pub fn place(dag: &Dag, size: NodeSize, direction: Direction, spacing: Spacing) -> Vec<Placement> {
    if dag.node_count() == 0 {
        return Vec::new();
    }

    let ranks = assign_ranks(dag);
    let mut graph = LayerGraph::build(dag, &ranks);
    graph.reduce_crossings();

    let (breadth, depth) = match direction {
        Direction::TopBottom => (size.width, size.height),
        Direction::LeftRight => (size.height, size.width),
    };
    let along = graph.breadth_coordinates(breadth, spacing.node);

    let min_along = (0..graph.real_count)
        .map(|v| along[v])
        .fold(f64::INFINITY, f64::min);
    let shift = breadth / 2.0 - min_along;

    (0..graph.real_count)
        .map(|v| {
            let across = ranks[v] as f64 * (depth + spacing.rank) + depth / 2.0;
            let along = along[v] + shift;
            let (x, y) = match direction {
                Direction::TopBottom => (along, across),
                Direction::LeftRight => (across, along),
            };
            debug_assert!(x.is_finite() && y.is_finite(), "non-finite placement");
            Placement {
                rank: ranks[v],
                x,
                y,
            }
        })
        .collect()
}

/// Edge crossings of the final ordering
#[cfg(test)]
fn crossing_count(dag: &Dag) -> usize {
    let ranks = assign_ranks(dag);
    let mut graph = LayerGraph::build(dag, &ranks);
    graph.reduce_crossings();
    graph.total_crossings()
}
