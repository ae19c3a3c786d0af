use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HistoryError;

/// Above this many commits a repository is considered large
pub const LARGE_REPO_THRESHOLD: usize = 10_000;
/// Above this many commits only the first-parent lineage is loaded by default
pub const HUGE_REPO_THRESHOLD: usize = 100_000;

/// How commit history is retrieved for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Everything in one request
    Full,
    /// Chunked stream of the whole history
    Paginated,
    /// Chunked stream of the first-parent lineage only
    Simplified,
}

impl RetrievalMode {
    pub fn first_parent(self) -> bool {
        matches!(self, RetrievalMode::Simplified)
    }

    pub fn is_streaming(self) -> bool {
        !matches!(self, RetrievalMode::Full)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalMode::Full => "full",
            RetrievalMode::Paginated => "paginated",
            RetrievalMode::Simplified => "simplified",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMode {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(RetrievalMode::Full),
            "paginated" => Ok(RetrievalMode::Paginated),
            "simplified" => Ok(RetrievalMode::Simplified),
            other => Err(HistoryError::Validation(format!(
                "unknown retrieval mode '{}'",
                other
            ))),
        }
    }
}

/// Size classification of a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStats {
    pub total_commits: usize,
    pub is_large_repo: bool,
    pub recommended_mode: RetrievalMode,
}

/// Map a total commit count to a retrieval recommendation
pub fn classify(total_commits: usize) -> RepoStats {
    let recommended_mode = if total_commits > HUGE_REPO_THRESHOLD {
        RetrievalMode::Simplified
    } else if total_commits > LARGE_REPO_THRESHOLD {
        RetrievalMode::Paginated
    } else {
        RetrievalMode::Full
    };

    RepoStats {
        total_commits,
        is_large_repo: total_commits > LARGE_REPO_THRESHOLD,
        recommended_mode,
    }
}
