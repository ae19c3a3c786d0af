pub mod classify;
pub mod error;
pub mod event;
pub mod git;
pub mod memory;
pub mod model;
pub mod provider;
pub mod stream;

pub use classify::{classify, RepoStats, RetrievalMode, HUGE_REPO_THRESHOLD, LARGE_REPO_THRESHOLD};
pub use error::{HistoryError, HistoryResult};
pub use event::{CommitBatch, HistoryEvent};
pub use git::GitProvider;
pub use memory::MemoryProvider;
pub use model::{
    Author, BranchInfo, Commit, CommitChunk, CommitPage, PageRequest, RefKind, RefLabel,
    RepoDescriptor, RepoHandle, RepoMetadata, StreamOptions, TagInfo,
};
pub use provider::{ChunkIter, Chunked, HistoryProvider};
pub use stream::{fetch_page, open_history_stream, repo_metadata, repo_stats, DEFAULT_CHUNK_SIZE};
