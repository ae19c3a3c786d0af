use gitgraph_core::{BranchInfo, Commit, RepoHandle, RepoMetadata, RepoStats, TagInfo};
use serde::Serialize;

/// Client side picture of one repository, filled in as history arrives.
///
/// `commits` only grows during a load. A new load replaces the whole view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryView {
    pub path: String,
    pub name: String,
    pub current_branch: Option<String>,
    pub branches: Vec<BranchInfo>,
    pub tags: Vec<TagInfo>,
    pub commits: Vec<Commit>,
    pub loaded_count: usize,
    pub total_count: usize,
    pub stats: Option<RepoStats>,
}

impl RepositoryView {
    /// Empty view named after the repository directory
    pub fn for_repo(repo: &RepoHandle) -> Self {
        let name = repo
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| repo.display());
        Self {
            path: repo.display(),
            name,
            ..Default::default()
        }
    }

    pub fn apply_metadata(&mut self, metadata: RepoMetadata) {
        self.path = metadata.path;
        self.name = metadata.name;
        self.current_branch = metadata.current_branch;
        self.branches = metadata.branches;
        self.tags = metadata.tags;
        self.total_count = self.total_count.max(metadata.stats.total_commits);
        self.stats = Some(metadata.stats);
    }

    /// Concatenate a batch; never reorders or de-duplicates
    pub fn append(&mut self, commits: Vec<Commit>, total: usize) {
        self.loaded_count += commits.len();
        self.commits.extend(commits);
        self.total_count = total.max(self.loaded_count);
    }

    /// History is complete: an over-reported total shrinks to what arrived
    pub fn finish(&mut self) {
        self.total_count = self.loaded_count;
    }

    pub fn has_more(&self) -> bool {
        self.loaded_count < self.total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgraph_core::classify;
    use gitgraph_core::memory::linear_history;

    #[test]
    fn append_keeps_arrival_order() {
        let history = linear_history(5);
        let mut view = RepositoryView::default();
        view.append(history[..2].to_vec(), 5);
        view.append(history[2..].to_vec(), 5);

        assert_eq!(view.commits, history);
        assert_eq!((view.loaded_count, view.total_count), (5, 5));
        assert!(!view.has_more());
    }

    #[test]
    fn total_never_below_loaded() {
        let mut view = RepositoryView::default();
        view.append(linear_history(3), 1);
        assert_eq!(view.total_count, 3);
    }

    #[test]
    fn finish_clamps_over_reported_total() {
        let mut view = RepositoryView::default();
        view.append(linear_history(3), 10);
        assert!(view.has_more());
        view.finish();
        assert_eq!(view.total_count, 3);
        assert!(!view.has_more());
    }

    #[test]
    fn metadata_fills_identity() {
        let repo = RepoHandle::new("/work/project").unwrap();
        let mut view = RepositoryView::for_repo(&repo);
        assert_eq!(view.name, "project");

        view.apply_metadata(RepoMetadata {
            path: "/work/project".to_string(),
            name: "project".to_string(),
            current_branch: Some("main".to_string()),
            branches: Vec::new(),
            tags: Vec::new(),
            stats: classify(42),
        });
        assert_eq!(view.current_branch.as_deref(), Some("main"));
        assert_eq!(view.total_count, 42);
        assert_eq!(view.stats.map(|s| s.total_commits), Some(42));
    }
}
