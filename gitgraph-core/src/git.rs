use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use git2::{BranchType, ErrorCode, Oid, Repository, Sort};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{HistoryError, HistoryResult};
use crate::model::{
    Author, BranchInfo, Commit, CommitPage, PageRequest, RefKind, RefLabel,
    RepoDescriptor, RepoHandle, StreamOptions, TagInfo,
};
use crate::provider::{ChunkIter, Chunked, HistoryProvider};

type RefMap = HashMap<Oid, Vec<RefLabel>>;

/// History provider backed by libgit2.
///
/// Every call opens the repository afresh, so the provider holds no state
/// across requests and concurrent enumerations never interfere.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitProvider;

impl GitProvider {
    pub fn new() -> Self {
        Self
    }

    fn open(repo: &RepoHandle) -> HistoryResult<Repository> {
        let path = repo.path();
        if !path.exists() {
            return Err(HistoryError::Validation(format!(
                "path does not exist: {}",
                path.display()
            )));
        }
        if !path.is_dir() {
            return Err(HistoryError::Validation(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        Repository::open(path).map_err(|err| match err.code() {
            ErrorCode::NotFound => HistoryError::NotARepository(path.to_path_buf()),
            _ => HistoryError::from(err),
        })
    }
}

/// Walk HEAD and every ref, newest first
fn history_oids(repo: &Repository, first_parent: bool) -> Result<Vec<Oid>> {
    let mut revwalk = repo.revwalk()?;
    // Ensure stable topology ordering for graph rendering
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    if first_parent {
        revwalk.simplify_first_parent()?;
    }

    // Unborn HEAD in a fresh repository has nothing to push
    if repo.head().is_ok() {
        revwalk.push_head()?;
    }
    revwalk.push_glob("refs/heads")?;
    revwalk.push_glob("refs/remotes")?;
    revwalk.push_glob("refs/tags")?;

    let oids = revwalk
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("walking commit history")?;
    Ok(oids)
}

/// List all refs grouped by the commit they point at
fn refs_by_oid(repo: &Repository) -> Result<RefMap> {
    let mut map: RefMap = HashMap::new();
    let head = repo.head().ok();
    let head_branch = head
        .as_ref()
        .filter(|h| h.is_branch())
        .and_then(|h| h.shorthand().map(str::to_string));

    // Detached HEAD gets its own label
    if let Some(head) = head.as_ref().filter(|h| !h.is_branch()) {
        if let Some(target) = head.target() {
            map.entry(target).or_default().push(RefLabel {
                name: "HEAD".to_string(),
                kind: RefKind::Branch,
                is_head: true,
            });
        }
    }

    for (branch_type, kind) in [(BranchType::Local, RefKind::Branch), (BranchType::Remote, RefKind::Remote)] {
        for br in repo.branches(Some(branch_type))? {
            let (branch, _) = br?;
            let Some(name) = branch.name()? else { continue };
            let Ok(commit) = branch.get().peel_to_commit() else { continue };
            map.entry(commit.id()).or_default().push(RefLabel {
                name: name.to_string(),
                kind,
                is_head: kind == RefKind::Branch && head_branch.as_deref() == Some(name),
            });
        }
    }

    // Tags, peeled so that annotated tags land on their commit
    for reference in repo.references_glob("refs/tags/*")? {
        let reference = reference?;
        let Some(name) = reference.shorthand().map(str::to_string) else { continue };
        let Ok(commit) = reference.peel_to_commit() else { continue };
        map.entry(commit.id()).or_default().push(RefLabel {
            name,
            kind: RefKind::Tag,
            is_head: false,
        });
    }

    Ok(map)
}

/// Convert a git2 commit into the wire record
fn commit_record(commit: &git2::Commit<'_>, refs: &RefMap) -> Result<Commit> {
    let hash = commit.id().to_string();
    let date = Utc
        .timestamp_opt(commit.time().seconds(), 0)
        .single()
        .context("Invalid commit timestamp")?;
    let author = commit.author();

    Ok(Commit {
        short_hash: hash.chars().take(7).collect(),
        hash,
        message: commit.summary().unwrap_or("").to_string(),
        body: commit.body().unwrap_or("").trim_end().to_string(),
        author: Author {
            name: author.name().unwrap_or("Unknown").to_string(),
            email: author.email().unwrap_or("").to_string(),
        },
        date,
        parents: commit.parent_ids().map(|oid| oid.to_string()).collect(),
        refs: refs.get(&commit.id()).cloned().unwrap_or_default(),
    })
}

fn load_commit(repo: &Repository, oid: Oid, refs: &RefMap) -> HistoryResult<Commit> {
    let commit = repo.find_commit(oid)?;
    Ok(commit_record(&commit, refs)?)
}

fn describe_repo(repo: &Repository, handle: &RepoHandle) -> Result<RepoDescriptor> {
    let head = repo.head().ok();
    let current_branch = head
        .as_ref()
        .filter(|h| h.is_branch())
        .and_then(|h| h.shorthand().map(str::to_string));

    let mut branches = Vec::new();
    for (branch_type, is_remote) in [(BranchType::Local, false), (BranchType::Remote, true)] {
        for br in repo.branches(Some(branch_type))? {
            let (branch, _) = br?;
            let name = branch.name()?.unwrap_or("").to_string();
            let Ok(commit) = branch.get().peel_to_commit() else { continue };
            branches.push(BranchInfo {
                is_head: !is_remote && current_branch.as_deref() == Some(name.as_str()),
                name,
                commit_id: commit.id().to_string(),
                is_remote,
            });
        }
    }

    let mut tags = Vec::new();
    for reference in repo.references_glob("refs/tags/*")? {
        let reference = reference?;
        let Some(name) = reference.shorthand().map(str::to_string) else { continue };
        let Ok(commit) = reference.peel_to_commit() else { continue };
        tags.push(TagInfo {
            name,
            commit_id: commit.id().to_string(),
        });
    }
    tags.sort_by(|a, b| a.name.cmp(&b.name));

    let root = repo.workdir().unwrap_or_else(|| repo.path());
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().trim_end_matches(".git").to_string())
        .unwrap_or_else(|| handle.display());

    Ok(RepoDescriptor {
        path: handle.display(),
        name,
        current_branch,
        branches,
        tags,
    })
}

impl HistoryProvider for GitProvider {
    fn describe(&self, repo: &RepoHandle) -> HistoryResult<RepoDescriptor> {
        let git = Self::open(repo)?;
        Ok(describe_repo(&git, repo)?)
    }

    fn total_count(&self, repo: &RepoHandle, first_parent: bool) -> HistoryResult<usize> {
        let git = Self::open(repo)?;
        Ok(history_oids(&git, first_parent)?.len())
    }

    fn page(&self, repo: &RepoHandle, request: &PageRequest) -> HistoryResult<CommitPage> {
        let git = Self::open(repo)?;
        let oids = history_oids(&git, request.first_parent)?;
        let refs = refs_by_oid(&git)?;
        let total = oids.len();

        let commits = oids
            .into_iter()
            .skip(request.skip)
            .take(request.max_count)
            .map(|oid| load_commit(&git, oid, &refs))
            .collect::<HistoryResult<Vec<_>>>()?;
        let has_more = request.skip + commits.len() < total;

        debug!(repo = %repo.display(), skip = request.skip, count = commits.len(), total, "served page");
        Ok(CommitPage {
            commits,
            total,
            has_more,
        })
    }

    fn chunks(&self, repo: &RepoHandle, options: &StreamOptions) -> HistoryResult<ChunkIter> {
        let git = Self::open(repo)?;
        let oids = history_oids(&git, options.first_parent)?;
        let refs = refs_by_oid(&git)?;
        let total = oids.len();

        debug!(repo = %repo.display(), total, chunk_size = options.chunk_size, "enumerating history");
        let commits = GitCommits {
            repo: git,
            oids: oids.into_iter(),
            refs,
        };
        Ok(Box::new(Chunked::new(commits, options.chunk_size, total)))
    }
}

/// Owns the repository so the enumeration can outlive the provider call
struct GitCommits {
    repo: Repository,
    oids: std::vec::IntoIter<Oid>,
    refs: RefMap,
}

impl Iterator for GitCommits {
    type Item = HistoryResult<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let oid = self.oids.next()?;
        Some(load_commit(&self.repo, oid, &self.refs))
    }
}
