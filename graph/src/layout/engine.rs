use gitgraph_core::Commit;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::core::Dag;
use crate::layout::color::{AuthorColors, BranchColors, ColorStrategy};
use crate::layout::layered::{self, Spacing};
use crate::layout::options::{node_size, Direction, DisplaySettings, LayoutOptions};

/// Top-left anchor of a laid out box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub commit: Commit,
    pub color: &'static str,
    pub compact: bool,
    pub highlighted: bool,
    pub selected: bool,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// `"{child}-{parent}"`
    pub id: String,
    pub source: String,
    pub target: String,
    pub is_merge: bool,
    pub color: &'static str,
}

/// Axis aligned box around every node
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn center_x(&self) -> f64 {
        (self.min_x + self.max_x) / 2.0
    }
}

/// Positioned commit graph, ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub direction: Direction,
    pub width: f64,
    pub height: f64,
}

impl GraphModel {
    pub fn empty(direction: Direction) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            direction,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Bounding box of all nodes, `None` for an empty graph
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.nodes.first()?;
        let init = Bounds {
            min_x: first.position.x,
            min_y: first.position.y,
            max_x: first.position.x + first.width,
            max_y: first.position.y + first.height,
        };
        Some(self.nodes.iter().fold(init, |b, n| Bounds {
            min_x: b.min_x.min(n.position.x),
            min_y: b.min_y.min(n.position.y),
            max_x: b.max_x.max(n.position.x + n.width),
            max_y: b.max_y.max(n.position.y + n.height),
        }))
    }
}

/// Lay out exactly the given commits.
///
/// The result depends only on commit identity, `options`, and the
/// `compact_mode`/`color_by_author` settings. Highlight and selection flags
/// are left unset; see [`apply_overlay`].
pub fn layout(commits: &[Commit], options: &LayoutOptions, settings: &DisplaySettings) -> GraphModel {
    if commits.is_empty() {
        return GraphModel::empty(options.direction);
    }

    let compact = settings.compact_mode;
    let size = node_size(compact);
    let (node_spacing, rank_spacing) = options.effective_spacing(compact);

    let dag = Dag::from_commits(commits);
    let colors = if settings.color_by_author {
        AuthorColors.assign(commits, &dag)
    } else {
        BranchColors.assign(commits, &dag)
    };
    let placements = layered::place(
        &dag,
        size,
        options.direction,
        Spacing {
            node: node_spacing,
            rank: rank_spacing,
        },
    );

    let nodes: Vec<GraphNode> = commits
        .iter()
        .zip(&placements)
        .zip(&colors)
        .map(|((commit, placed), &color)| GraphNode {
            id: commit.hash.clone(),
            commit: commit.clone(),
            color,
            compact,
            highlighted: false,
            selected: false,
            position: Position {
                x: placed.x - size.width / 2.0,
                y: placed.y - size.height / 2.0,
            },
            width: size.width,
            height: size.height,
            rank: placed.rank,
        })
        .collect();

    let edges = dag
        .edges
        .iter()
        .map(|e| {
            let (child, parent) = (&commits[e.from], &commits[e.to]);
            GraphEdge {
                id: format!("{}-{}", child.hash, parent.hash),
                source: child.hash.clone(),
                target: parent.hash.clone(),
                is_merge: e.is_merge(),
                // merge edges carry the color of the branch merged in
                color: if e.is_merge() { colors[e.to] } else { colors[e.from] },
            }
        })
        .collect();

    let mut model = GraphModel {
        nodes,
        edges,
        direction: options.direction,
        width: 0.0,
        height: 0.0,
    };
    if let Some(bounds) = model.bounds() {
        model.width = bounds.max_x - bounds.min_x;
        model.height = bounds.max_y - bounds.min_y;
    }

    let shape = dag.stats();
    debug!(
        nodes = model.nodes.len(),
        edges = model.edges.len(),
        merges = shape.merge_commits,
        roots = shape.root_commits,
        tips = shape.tip_commits,
        width = model.width,
        height = model.height,
        "laid out commit graph"
    );
    model
}

/// Set highlight and selection flags without touching geometry
pub fn apply_overlay(model: &mut GraphModel, highlighted: &HashSet<String>, selected: Option<&str>) {
    for node in &mut model.nodes {
        node.highlighted = highlighted.contains(&node.id);
        node.selected = selected == Some(node.id.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgraph_core::memory::{linear_history, sample_commit};
    use pretty_assertions::assert_eq;

    fn merge_history() -> Vec<Commit> {
        vec![
            sample_commit("m", &["b", "f"]),
            sample_commit("f", &["a"]),
            sample_commit("b", &["a"]),
            sample_commit("a", &[]),
        ]
    }

    fn geometry(model: &GraphModel) -> Vec<(String, f64, f64, &'static str)> {
        model
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.position.x, n.position.y, n.color))
            .collect()
    }

    #[test]
    fn empty_input_gives_empty_graph() {
        let model = layout(&[], &LayoutOptions::default(), &DisplaySettings::default());
        assert!(model.is_empty());
        assert!(model.edges.is_empty());
        assert_eq!(model.bounds(), None);
    }

    #[test]
    fn isolated_commit_has_no_edges() {
        let commits = vec![
            sample_commit("A", &["B"]),
            sample_commit("B", &[]),
            sample_commit("C", &[]),
        ];
        let model = layout(&commits, &LayoutOptions::default(), &DisplaySettings::default());
        assert_eq!(model.nodes.len(), 3);
        assert_eq!(model.edges.len(), 1);
        let edge = &model.edges[0];
        assert_eq!((edge.source.as_str(), edge.target.as_str()), ("A", "B"));
        assert_eq!(edge.id, "A-B");
        assert!(!edge.is_merge);
    }

    #[test]
    fn layout_is_idempotent() {
        let commits = merge_history();
        let opts = LayoutOptions::default();
        let settings = DisplaySettings::default();
        assert_eq!(layout(&commits, &opts, &settings), layout(&commits, &opts, &settings));
    }

    #[test]
    fn highlight_does_not_move_nodes() {
        let commits = merge_history();
        let opts = LayoutOptions::default();
        let plain = layout(&commits, &opts, &DisplaySettings::default());

        let settings = DisplaySettings {
            highlighted_commits: ["f".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let mut lit = layout(&commits, &opts, &settings);
        assert_eq!(geometry(&plain), geometry(&lit));

        apply_overlay(&mut lit, &settings.highlighted_commits, Some("a"));
        assert_eq!(geometry(&plain), geometry(&lit));
        assert!(lit.node("f").unwrap().highlighted);
        assert!(lit.node("a").unwrap().selected);
        assert!(!lit.node("m").unwrap().highlighted && !lit.node("m").unwrap().selected);
    }

    #[test]
    fn merge_edges_are_flagged() {
        let model = layout(&merge_history(), &LayoutOptions::default(), &DisplaySettings::default());
        let merges: Vec<&str> = model
            .edges
            .iter()
            .filter(|e| e.is_merge)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(merges, vec!["m-f"]);
    }

    #[test]
    fn children_sit_above_parents() {
        let model = layout(&merge_history(), &LayoutOptions::default(), &DisplaySettings::default());
        for edge in &model.edges {
            let child = model.node(&edge.source).unwrap();
            let parent = model.node(&edge.target).unwrap();
            assert!(child.position.y < parent.position.y);
        }
    }

    #[test]
    fn compact_mode_shrinks_nodes_and_graph() {
        let commits = linear_history(4);
        let opts = LayoutOptions::default();
        let normal = layout(&commits, &opts, &DisplaySettings::default());
        let compact = layout(
            &commits,
            &opts,
            &DisplaySettings {
                compact_mode: true,
                ..Default::default()
            },
        );
        assert_eq!(normal.nodes[0].width, 220.0);
        assert_eq!(compact.nodes[0].width, 140.0);
        assert!(compact.nodes.iter().all(|n| n.compact));
        assert!(compact.height < normal.height);
    }

    #[test]
    fn top_left_anchor_starts_at_origin() {
        let model = layout(&linear_history(3), &LayoutOptions::default(), &DisplaySettings::default());
        let bounds = model.bounds().unwrap();
        assert_eq!((bounds.min_x, bounds.min_y), (0.0, 0.0));
        // 3 ranks of 64 with 2 gaps of 60
        assert_eq!(model.height, 3.0 * 64.0 + 2.0 * 60.0);
        assert_eq!(model.width, 220.0);
    }

    #[test]
    fn author_coloring_groups_by_author() {
        let mut commits = linear_history(3);
        commits[1].author.email = "other@example.com".to_string();
        let settings = DisplaySettings {
            color_by_author: true,
            ..Default::default()
        };
        let model = layout(&commits, &LayoutOptions::default(), &settings);
        assert_eq!(model.nodes[0].color, model.nodes[2].color);
    }
}
