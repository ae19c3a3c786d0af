use gitgraph_core::Commit;
use std::collections::HashSet;
use tracing::trace;

use crate::layout::engine::{apply_overlay, layout, GraphModel};
use crate::layout::options::{Direction, DisplaySettings, LayoutOptions};

/// Everything a layout depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LayoutKey {
    fingerprint: u64,
    commit_count: usize,
    direction: Direction,
    node_spacing: u64,
    rank_spacing: u64,
    compact: bool,
    by_author: bool,
}

impl LayoutKey {
    fn new(commits: &[Commit], options: &LayoutOptions, settings: &DisplaySettings) -> Self {
        Self {
            fingerprint: fingerprint(commits),
            commit_count: commits.len(),
            direction: options.direction,
            node_spacing: options.node_spacing.to_bits(),
            rank_spacing: options.rank_spacing.to_bits(),
            compact: settings.compact_mode,
            by_author: settings.color_by_author,
        }
    }
}

/// FNV-1a over hashes, parents, refs and author emails
fn fingerprint(commits: &[Commit]) -> u64 {
    let mut hash: u64 = 1469598103934665603;
    let mut feed = |bytes: &[u8]| {
        for b in bytes {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        // separator so ["ab", "c"] and ["a", "bc"] differ
        hash ^= 0xff;
        hash = hash.wrapping_mul(1099511628211);
    };
    for commit in commits {
        feed(commit.hash.as_bytes());
        for parent in &commit.parents {
            feed(parent.as_bytes());
        }
        for label in &commit.refs {
            feed(label.name.as_bytes());
        }
        feed(commit.author.email.as_bytes());
    }
    hash
}

/// Memoizes the last layout so overlay-only changes skip the layout pass
#[derive(Debug, Default)]
pub struct LayoutCache {
    entry: Option<(LayoutKey, GraphModel)>,
    hits: u64,
    misses: u64,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Laid out graph with highlight and selection applied
    pub fn render(
        &mut self,
        commits: &[Commit],
        options: &LayoutOptions,
        settings: &DisplaySettings,
        selected: Option<&str>,
    ) -> GraphModel {
        let mut model = self.layout(commits, options, settings).clone();
        apply_overlay(&mut model, &settings.highlighted_commits, selected);
        model
    }

    /// Cached layout without overlay flags
    pub fn layout(
        &mut self,
        commits: &[Commit],
        options: &LayoutOptions,
        settings: &DisplaySettings,
    ) -> &GraphModel {
        let key = LayoutKey::new(commits, options, settings);
        if matches!(&self.entry, Some((cached, _)) if *cached == key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            trace!(commits = commits.len(), "layout cache miss");
            self.entry = None;
        }

        &self
            .entry
            .get_or_insert_with(|| (key, layout(commits, options, settings)))
            .1
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Highlighted set from an iterator of hashes
pub fn highlight_set<I, S>(hashes: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    hashes.into_iter().map(Into::into).collect()
}
