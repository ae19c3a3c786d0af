//! Secondary row of boxes (stashes, worktrees, ...) placed under the commit
//! graph without laying the graph out again.

use serde::{Deserialize, Serialize};

use crate::layout::engine::{GraphModel, Position};
use crate::layout::options::NodeSize;

pub const AUX_NODE_SIZE: NodeSize = NodeSize { width: 180.0, height: 48.0 };
pub const COMPACT_AUX_NODE_SIZE: NodeSize = NodeSize { width: 120.0, height: 30.0 };

const AUX_SPACING: f64 = 40.0;
const COMPACT_AUX_SPACING: f64 = 20.0;
const AUX_GAP: f64 = 80.0;
const COMPACT_AUX_GAP: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxItem {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxNode {
    pub id: String,
    pub label: String,
    pub position: Position,
    pub width: f64,
    pub height: f64,
}

/// Place `items` in one row below `primary`, centered under its bounding box.
/// With an empty primary graph the row is centered on the origin.
pub fn layout_auxiliary(primary: &GraphModel, items: &[AuxItem], compact: bool) -> Vec<AuxNode> {
    if items.is_empty() {
        return Vec::new();
    }

    let (size, spacing, gap) = if compact {
        (COMPACT_AUX_NODE_SIZE, COMPACT_AUX_SPACING, COMPACT_AUX_GAP)
    } else {
        (AUX_NODE_SIZE, AUX_SPACING, AUX_GAP)
    };

    let row_width = items.len() as f64 * size.width + (items.len() - 1) as f64 * spacing;
    let (center_x, top) = match primary.bounds() {
        Some(bounds) => (bounds.center_x(), bounds.max_y + gap),
        None => (0.0, -size.height / 2.0),
    };
    let left = center_x - row_width / 2.0;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| AuxNode {
            id: item.id.clone(),
            label: item.label.clone(),
            position: Position {
                x: left + i as f64 * (size.width + spacing),
                y: top,
            },
            width: size.width,
            height: size.height,
        })
        .collect()
}
