use gitgraph_core::memory::sample_commit;
use gitgraph_core::Commit;
use graph::{apply_overlay, layout, Direction, DisplaySettings, LayoutOptions};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

/// Mainline with a feature branch merged every few commits. Newest first.
fn branchy_history(len: usize) -> Vec<Commit> {
    let mut commits = Vec::new();
    for i in (0..len).rev() {
        let hash = format!("m{i}");
        let mut parents = Vec::new();
        if i > 0 {
            parents.push(format!("m{}", i - 1));
        }
        if i % 4 == 3 {
            parents.push(format!("f{i}"));
        }
        let parent_refs: Vec<&str> = parents.iter().map(String::as_str).collect();
        commits.push(sample_commit(&hash, &parent_refs));

        if i % 4 == 3 {
            // feature commit forks from two commits back
            let base = format!("m{}", i.saturating_sub(2));
            commits.push(sample_commit(&format!("f{i}"), &[base.as_str()]));
        }
    }
    commits
}

#[test]
fn edges_match_visible_parent_links() {
    let mut commits = branchy_history(20);
    // drop the oldest commits: their children keep dangling parent hashes
    commits.truncate(commits.len() - 3);
    let visible: HashSet<&str> = commits.iter().map(|c| c.hash.as_str()).collect();

    let expected: HashSet<(String, String)> = commits
        .iter()
        .flat_map(|c| c.parents.iter().map(move |p| (c.hash.clone(), p.clone())))
        .filter(|(_, p)| visible.contains(p.as_str()))
        .collect();

    let model = layout(&commits, &LayoutOptions::default(), &DisplaySettings::default());
    let actual: HashSet<(String, String)> = model
        .edges
        .iter()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();

    assert_eq!(model.nodes.len(), commits.len());
    assert_eq!(actual, expected);
}

#[test]
fn nodes_in_one_rank_never_overlap() {
    let commits = branchy_history(24);
    for direction in [Direction::TopBottom, Direction::LeftRight] {
        let opts = LayoutOptions {
            direction,
            ..Default::default()
        };
        let model = layout(&commits, &opts, &DisplaySettings::default());

        for a in &model.nodes {
            for b in &model.nodes {
                if a.id >= b.id || a.rank != b.rank {
                    continue;
                }
                let apart_x = a.position.x + a.width <= b.position.x + 1e-6
                    || b.position.x + b.width <= a.position.x + 1e-6;
                let apart_y = a.position.y + a.height <= b.position.y + 1e-6
                    || b.position.y + b.height <= a.position.y + 1e-6;
                assert!(apart_x || apart_y, "{} overlaps {}", a.id, b.id);
            }
        }
        assert!(model
            .nodes
            .iter()
            .all(|n| n.position.x.is_finite() && n.position.y.is_finite()));
    }
}

#[test]
fn layout_ignores_highlight_and_selection() {
    let commits = branchy_history(12);
    let opts = LayoutOptions::default();
    let base = layout(&commits, &opts, &DisplaySettings::default());

    let settings = DisplaySettings {
        highlighted_commits: ["m3", "f7"].iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    let mut other = layout(&commits, &opts, &settings);
    apply_overlay(&mut other, &settings.highlighted_commits, Some("m0"));

    for (a, b) in base.nodes.iter().zip(&other.nodes) {
        assert_eq!((a.position, a.color), (b.position, b.color));
    }
    assert_eq!(other.nodes.iter().filter(|n| n.highlighted).count(), 2);
}

#[test]
fn graph_model_serializes_camel_case() {
    let commits = branchy_history(4);
    let model = layout(&commits, &LayoutOptions::default(), &DisplaySettings::default());
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["direction"], "TB");
    assert!(json["edges"][0].get("isMerge").is_some());
    assert!(json["nodes"][0]["commit"].get("shortHash").is_some());
}
