use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classify::RepoStats;
use crate::error::{HistoryError, HistoryResult};

/// Commit author identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Branch,
    Tag,
    Remote,
}

/// A ref decorating a commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefLabel {
    pub name: String,
    pub kind: RefKind,
    pub is_head: bool,
}

/// One immutable commit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    pub short_hash: String,
    /// Summary line
    pub message: String,
    pub body: String,
    pub author: Author,
    pub date: DateTime<Utc>,
    /// Parent hashes, first parent first
    pub parents: Vec<String>,
    #[serde(default)]
    pub refs: Vec<RefLabel>,
}

impl Commit {
    /// Check if this is a root commit (no parents)
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Check if this is a merge commit (multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchInfo {
    pub name: String,
    pub commit_id: String,
    pub is_head: bool,
    pub is_remote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInfo {
    pub name: String,
    pub commit_id: String,
}

/// Repository identity as reported by a history provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoDescriptor {
    pub path: String,
    pub name: String,
    pub current_branch: Option<String>,
    pub branches: Vec<BranchInfo>,
    pub tags: Vec<TagInfo>,
}

/// Payload of the `metadata` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMetadata {
    pub path: String,
    pub name: String,
    pub current_branch: Option<String>,
    pub branches: Vec<BranchInfo>,
    pub tags: Vec<TagInfo>,
    pub stats: RepoStats,
}

impl RepoMetadata {
    pub fn new(descriptor: RepoDescriptor, stats: RepoStats) -> Self {
        Self {
            path: descriptor.path,
            name: descriptor.name,
            current_branch: descriptor.current_branch,
            branches: descriptor.branches,
            tags: descriptor.tags,
            stats,
        }
    }
}

/// Handle to a repository the providers know how to open
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoHandle {
    path: PathBuf,
}

impl RepoHandle {
    pub fn new(path: impl Into<PathBuf>) -> HistoryResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(HistoryError::Validation("repository path is empty".to_string()));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn display(&self) -> String {
        self.path.display().to_string()
    }
}

/// Request for one page of history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub skip: usize,
    pub max_count: usize,
    #[serde(default)]
    pub first_parent: bool,
}

/// One page of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPage {
    pub commits: Vec<Commit>,
    pub total: usize,
    pub has_more: bool,
}

/// Parameters of a chunked enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOptions {
    pub chunk_size: usize,
    #[serde(default)]
    pub first_parent: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: crate::stream::DEFAULT_CHUNK_SIZE,
            first_parent: false,
        }
    }
}

/// One chunk produced by a provider enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitChunk {
    pub commits: Vec<Commit>,
    pub progress_percent: u8,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn commit(parents: &[&str]) -> Commit {
        Commit {
            hash: "abcdef0123456789".to_string(),
            short_hash: "abcdef0".to_string(),
            message: "Add parser".to_string(),
            body: String::new(),
            author: Author {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
            date: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            refs: vec![RefLabel {
                name: "main".to_string(),
                kind: RefKind::Branch,
                is_head: true,
            }],
        }
    }

    #[test]
    fn parent_shapes() {
        assert!(commit(&[]).is_root());
        assert!(!commit(&["a"]).is_merge());
        assert!(commit(&["a", "b"]).is_merge());
    }

    #[test]
    fn commit_uses_camel_case_on_the_wire() {
        let value = serde_json::to_value(commit(&["p1"])).unwrap();
        assert_eq!(value["shortHash"], "abcdef0");
        assert_eq!(value["refs"][0]["isHead"], true);
        assert_eq!(value["refs"][0]["kind"], "branch");
        assert_eq!(value["parents"][0], "p1");
    }

    #[test]
    fn empty_handle_is_rejected() {
        assert!(matches!(RepoHandle::new(""), Err(HistoryError::Validation(_))));
        assert_eq!(RepoHandle::new("/srv/repo").unwrap().display(), "/srv/repo");
    }
}
