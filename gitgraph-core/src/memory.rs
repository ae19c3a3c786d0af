use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::error::{HistoryError, HistoryResult};
use crate::model::{
    Author, BranchInfo, Commit, CommitPage, PageRequest, RefKind, RepoDescriptor, RepoHandle,
    StreamOptions, TagInfo,
};
use crate::provider::{ChunkIter, Chunked, HistoryProvider};

/// History provider over commit lists held in memory.
///
/// Useful for tests and demos: every registered path behaves like a
/// repository whose history is exactly the given commits, newest first.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    repos: HashMap<PathBuf, Vec<Commit>>,
    fail_after_chunks: Option<usize>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, path: impl Into<PathBuf>, commits: Vec<Commit>) -> Self {
        self.repos.insert(path.into(), commits);
        self
    }

    /// Make every chunked enumeration fail after `chunks` chunks
    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after_chunks = Some(chunks);
        self
    }

    fn commits(&self, repo: &RepoHandle) -> HistoryResult<&Vec<Commit>> {
        self.repos
            .get(repo.path())
            .ok_or_else(|| HistoryError::NotARepository(repo.path().to_path_buf()))
    }

    fn selection(&self, repo: &RepoHandle, first_parent: bool) -> HistoryResult<Vec<Commit>> {
        let commits = self.commits(repo)?;
        if !first_parent {
            return Ok(commits.clone());
        }
        let keep = first_parent_lineage(commits);
        Ok(commits
            .iter()
            .filter(|c| keep.contains(c.hash.as_str()))
            .cloned()
            .collect())
    }
}

/// Hashes reachable from any tip by following first parents only
fn first_parent_lineage(commits: &[Commit]) -> HashSet<&str> {
    let by_hash: HashMap<&str, &Commit> = commits.iter().map(|c| (c.hash.as_str(), c)).collect();
    let referenced: HashSet<&str> = commits
        .iter()
        .flat_map(|c| c.parents.iter().map(String::as_str))
        .collect();

    let mut keep = HashSet::new();
    for tip in commits
        .iter()
        .filter(|c| !referenced.contains(c.hash.as_str()) || !c.refs.is_empty())
    {
        let mut cursor = Some(tip);
        while let Some(commit) = cursor {
            if !keep.insert(commit.hash.as_str()) {
                break;
            }
            cursor = commit
                .parents
                .first()
                .and_then(|p| by_hash.get(p.as_str()).copied());
        }
    }
    keep
}

impl HistoryProvider for MemoryProvider {
    fn describe(&self, repo: &RepoHandle) -> HistoryResult<RepoDescriptor> {
        let commits = self.commits(repo)?;
        let mut branches = Vec::new();
        let mut tags = Vec::new();
        let mut current_branch = None;

        for commit in commits {
            for label in &commit.refs {
                match label.kind {
                    RefKind::Branch | RefKind::Remote => {
                        if label.is_head {
                            current_branch = Some(label.name.clone());
                        }
                        branches.push(BranchInfo {
                            name: label.name.clone(),
                            commit_id: commit.hash.clone(),
                            is_head: label.is_head,
                            is_remote: label.kind == RefKind::Remote,
                        });
                    }
                    RefKind::Tag => tags.push(TagInfo {
                        name: label.name.clone(),
                        commit_id: commit.hash.clone(),
                    }),
                }
            }
        }

        let name = repo
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| repo.display());

        Ok(RepoDescriptor {
            path: repo.display(),
            name,
            current_branch,
            branches,
            tags,
        })
    }

    fn total_count(&self, repo: &RepoHandle, first_parent: bool) -> HistoryResult<usize> {
        Ok(self.selection(repo, first_parent)?.len())
    }

    fn page(&self, repo: &RepoHandle, request: &PageRequest) -> HistoryResult<CommitPage> {
        let selected = self.selection(repo, request.first_parent)?;
        let total = selected.len();
        let commits: Vec<Commit> = selected
            .into_iter()
            .skip(request.skip)
            .take(request.max_count)
            .collect();
        let has_more = request.skip + commits.len() < total;
        Ok(CommitPage {
            commits,
            total,
            has_more,
        })
    }

    fn chunks(&self, repo: &RepoHandle, options: &StreamOptions) -> HistoryResult<ChunkIter> {
        let selected = self.selection(repo, options.first_parent)?;
        let total = selected.len();
        let chunked = Chunked::new(selected.into_iter().map(Ok), options.chunk_size, total);

        Ok(match self.fail_after_chunks {
            Some(n) => Box::new(chunked.take(n).chain(std::iter::once(Err(
                HistoryError::Provider("object database unavailable".to_string()),
            )))),
            None => Box::new(chunked),
        })
    }
}

/// Build a commit record with deterministic fields, for fixtures
pub fn sample_commit(hash: &str, parents: &[&str]) -> Commit {
    Commit {
        hash: hash.to_string(),
        short_hash: hash.chars().take(7).collect(),
        message: format!("Commit {}", hash),
        body: String::new(),
        author: Author {
            name: "Tester".to_string(),
            email: "tester@example.com".to_string(),
        },
        date: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default(),
        parents: parents.iter().map(|p| p.to_string()).collect(),
        refs: Vec::new(),
    }
}

/// Linear history `c{n-1} -> ... -> c0`, newest first
pub fn linear_history(n: usize) -> Vec<Commit> {
    (0..n)
        .rev()
        .map(|i| {
            let hash = format!("c{}", i);
            if i == 0 {
                sample_commit(&hash, &[])
            } else {
                sample_commit(&hash, &[&format!("c{}", i - 1)])
            }
        })
        .collect()
}
