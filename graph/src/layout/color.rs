use gitgraph_core::{Commit, RefKind, RefLabel};

use crate::core::Dag;

pub const PALETTE: [&str; 12] = [
    "#22d3ee", "#4ade80", "#facc15", "#e879f9", "#60a5fa", "#f87171",
    "#2dd4bf", "#a3e635", "#fb923c", "#c084fc", "#38bdf8", "#fb7185",
];

/// Stable palette slot for a key (FNV-1a)
pub fn stable_color_index(key: &str, modulo: usize) -> usize {
    let mut hash: u64 = 1469598103934665603;
    for b in key.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    (hash % modulo.max(1) as u64) as usize
}

pub fn color_for(key: &str) -> &'static str {
    PALETTE[stable_color_index(key, PALETTE.len())]
}

/// How node colors are chosen
pub trait ColorStrategy {
    /// One color per commit, indexed like `commits`
    fn assign(&self, commits: &[Commit], dag: &Dag) -> Vec<&'static str>;
}

/// Stable color per author identity
pub struct AuthorColors;

impl ColorStrategy for AuthorColors {
    fn assign(&self, commits: &[Commit], _dag: &Dag) -> Vec<&'static str> {
        commits
            .iter()
            .map(|c| {
                let key = if c.author.email.is_empty() {
                    c.author.name.to_lowercase()
                } else {
                    c.author.email.to_lowercase()
                };
                color_for(&key)
            })
            .collect()
    }
}

/// Stable color per lineage.
///
/// A commit carrying refs starts a lineage named after its preferred ref.
/// Otherwise it continues the lineage of the earliest child it is the first
/// parent of, and a commit reached only through merges starts a lineage of
/// its own.
pub struct BranchColors;

impl BranchColors {
    fn ref_rank(label: &RefLabel) -> u8 {
        match (label.is_head, label.kind) {
            (true, _) => 0,
            (false, RefKind::Branch) => 1,
            (false, RefKind::Remote) => 2,
            (false, RefKind::Tag) => 3,
        }
    }

    fn preferred_ref(refs: &[RefLabel]) -> Option<&str> {
        refs.iter()
            .min_by(|a, b| {
                Self::ref_rank(a)
                    .cmp(&Self::ref_rank(b))
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|r| r.name.as_str())
    }

    /// Lineage key of every commit
    pub fn lineage_keys<'a>(commits: &'a [Commit], dag: &Dag) -> Vec<&'a str> {
        let order = dag.topo_order();
        let mut position = vec![0usize; commits.len()];
        for (pos, &v) in order.iter().enumerate() {
            position[v] = pos;
        }

        let mut keys: Vec<Option<&'a str>> = vec![None; commits.len()];
        for &v in &order {
            let commit = &commits[v];
            let key = Self::preferred_ref(&commit.refs).or_else(|| {
                // First parent continues the child's lineage
                dag.nodes[v]
                    .children
                    .iter()
                    .copied()
                    .filter(|&c| dag.nodes[c].first_parent() == Some(v))
                    .min_by_key(|&c| position[c])
                    .and_then(|c| keys[c])
            });
            keys[v] = Some(key.unwrap_or(commit.hash.as_str()));
        }

        keys.into_iter()
            .zip(commits)
            .map(|(k, c)| k.unwrap_or(c.hash.as_str()))
            .collect()
    }
}

impl ColorStrategy for BranchColors {
    fn assign(&self, commits: &[Commit], dag: &Dag) -> Vec<&'static str> {
        Self::lineage_keys(commits, dag)
            .into_iter()
            .map(color_for)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgraph_core::memory::sample_commit;

    fn label(name: &str, kind: RefKind, is_head: bool) -> RefLabel {
        RefLabel { name: name.to_string(), kind, is_head }
    }

    /// main: m -> b -> a ; feature: f -> a, merged by m
    fn history() -> Vec<Commit> {
        let mut m = sample_commit("m", &["b", "f"]);
        m.refs.push(label("main", RefKind::Branch, true));
        m.refs.push(label("origin/main", RefKind::Remote, false));
        vec![
            m,
            sample_commit("f", &["a"]),
            sample_commit("b", &["a"]),
            sample_commit("a", &[]),
        ]
    }

    #[test]
    fn first_parent_chain_shares_lineage() {
        let commits = history();
        let dag = Dag::from_commits(&commits);
        let keys = BranchColors::lineage_keys(&commits, &dag);
        assert_eq!(keys, vec!["main", "f", "main", "main"]);
    }

    #[test]
    fn head_ref_wins_over_other_refs() {
        let refs = vec![
            label("v1", RefKind::Tag, false),
            label("zeta", RefKind::Branch, false),
            label("alpha", RefKind::Branch, true),
        ];
        assert_eq!(BranchColors::preferred_ref(&refs), Some("alpha"));
        assert_eq!(BranchColors::preferred_ref(&refs[..2]), Some("zeta"));
    }

    #[test]
    fn colors_do_not_depend_on_unrelated_input_order() {
        let commits = history();
        let dag = Dag::from_commits(&commits);
        let colors = BranchColors.assign(&commits, &dag);

        // swap the two independent middle commits
        let swapped = vec![commits[0].clone(), commits[2].clone(), commits[1].clone(), commits[3].clone()];
        let dag2 = Dag::from_commits(&swapped);
        let colors2 = BranchColors.assign(&swapped, &dag2);

        assert_eq!(colors[0], colors2[0]);
        assert_eq!(colors[1], colors2[2]);
        assert_eq!(colors[2], colors2[1]);
    }

    #[test]
    fn author_colors_ignore_email_case() {
        let mut a = sample_commit("a", &[]);
        a.author.email = "Dev@Example.com".to_string();
        let mut b = sample_commit("b", &[]);
        b.author.email = "dev@example.com".to_string();
        let commits = vec![a, b];
        let colors = AuthorColors.assign(&commits, &Dag::from_commits(&commits));
        assert_eq!(colors[0], colors[1]);
    }

    #[test]
    fn stable_index_is_in_range() {
        for key in ["", "main", "feature/login", "release-1.2"] {
            assert!(stable_color_index(key, PALETTE.len()) < PALETTE.len());
        }
        assert_eq!(color_for("main"), color_for("main"));
    }
}
