use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Flow of ranks in the laid out graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Newest commits on top
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    /// Newest commits on the left
    #[serde(rename = "LR")]
    LeftRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    pub direction: Direction,
    /// Gap between neighbouring nodes of one rank
    pub node_spacing: f64,
    /// Gap between consecutive ranks
    pub rank_spacing: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            node_spacing: 50.0,
            rank_spacing: 60.0,
        }
    }
}

impl LayoutOptions {
    /// Spacing actually used, halved in compact mode
    pub(crate) fn effective_spacing(&self, compact: bool) -> (f64, f64) {
        let factor = if compact { 0.5 } else { 1.0 };
        (
            sanitize(self.node_spacing) * factor,
            sanitize(self.rank_spacing) * factor,
        )
    }
}

fn sanitize(spacing: f64) -> f64 {
    if spacing.is_finite() && spacing > 0.0 {
        spacing
    } else {
        0.0
    }
}

/// Presentation settings. Only `compact_mode` and `color_by_author` influence
/// layout; `highlighted_commits` is applied as an overlay afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub compact_mode: bool,
    pub color_by_author: bool,
    #[serde(default)]
    pub highlighted_commits: HashSet<String>,
}

/// Width and height of a laid out box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeSize {
    pub width: f64,
    pub height: f64,
}

pub const NODE_SIZE: NodeSize = NodeSize { width: 220.0, height: 64.0 };
pub const COMPACT_NODE_SIZE: NodeSize = NodeSize { width: 140.0, height: 36.0 };

pub fn node_size(compact: bool) -> NodeSize {
    if compact {
        COMPACT_NODE_SIZE
    } else {
        NODE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_halves_spacing() {
        let opts = LayoutOptions::default();
        assert_eq!(opts.effective_spacing(false), (50.0, 60.0));
        assert_eq!(opts.effective_spacing(true), (25.0, 30.0));
    }

    #[test]
    fn bad_spacing_collapses_to_zero() {
        let opts = LayoutOptions {
            node_spacing: f64::NAN,
            rank_spacing: -3.0,
            ..Default::default()
        };
        assert_eq!(opts.effective_spacing(false), (0.0, 0.0));
    }

    #[test]
    fn direction_wire_names() {
        assert_eq!(serde_json::to_string(&Direction::LeftRight).unwrap(), r#""LR""#);
        assert!(node_size(true).width < node_size(false).width);
    }
}
