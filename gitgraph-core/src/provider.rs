use crate::error::HistoryResult;
use crate::model::{Commit, CommitChunk, CommitPage, PageRequest, RepoDescriptor, RepoHandle, StreamOptions};
use crate::stream::progress_percent;

/// Lazy, finite sequence of chunks. Not restartable: call
/// [`HistoryProvider::chunks`] again to enumerate from the start.
pub type ChunkIter = Box<dyn Iterator<Item = HistoryResult<CommitChunk>> + Send>;

/// Source of commit history for a repository.
///
/// Implementations enumerate history in reverse-chronological, all-refs order
/// and emit every commit exactly once per enumeration.
pub trait HistoryProvider: Send + Sync {
    /// Identity, branches and tags. Fails with a validation error when the
    /// handle does not point at a readable repository.
    fn describe(&self, repo: &RepoHandle) -> HistoryResult<RepoDescriptor>;

    fn total_count(&self, repo: &RepoHandle, first_parent: bool) -> HistoryResult<usize>;

    fn page(&self, repo: &RepoHandle, request: &PageRequest) -> HistoryResult<CommitPage>;

    fn chunks(&self, repo: &RepoHandle, options: &StreamOptions) -> HistoryResult<ChunkIter>;
}

/// Groups a commit iterator into chunks of `chunk_size`, attaching cumulative
/// progress against a known total.
pub struct Chunked<I> {
    inner: I,
    chunk_size: usize,
    total: usize,
    emitted: usize,
    failed: bool,
}

impl<I> Chunked<I>
where
    I: Iterator<Item = HistoryResult<Commit>>,
{
    pub fn new(inner: I, chunk_size: usize, total: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            total,
            emitted: 0,
            failed: false,
        }
    }
}

impl<I> Iterator for Chunked<I>
where
    I: Iterator<Item = HistoryResult<Commit>>,
{
    type Item = HistoryResult<CommitChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut commits = Vec::with_capacity(self.chunk_size);
        while commits.len() < self.chunk_size {
            match self.inner.next() {
                Some(Ok(commit)) => commits.push(commit),
                Some(Err(err)) => {
                    // Commits gathered before the failure are lost with the chunk
                    self.failed = true;
                    return Some(Err(err));
                }
                None => break,
            }
        }

        if commits.is_empty() {
            return None;
        }

        self.emitted += commits.len();
        Some(Ok(CommitChunk {
            commits,
            progress_percent: progress_percent(self.emitted, self.total),
            total: self.total,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use crate::memory::sample_commit;

    fn commits(n: usize) -> Vec<HistoryResult<Commit>> {
        (0..n).map(|i| Ok(sample_commit(&format!("c{}", i), &[]))).collect()
    }

    #[test]
    fn chunks_carry_cumulative_progress() {
        let chunks: Vec<CommitChunk> = Chunked::new(commits(2437).into_iter(), 1000, 2437)
            .collect::<HistoryResult<_>>()
            .unwrap();

        let sizes: Vec<usize> = chunks.iter().map(|c| c.commits.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 437]);
        let progress: Vec<u8> = chunks.iter().map(|c| c.progress_percent).collect();
        assert_eq!(progress, vec![41, 82, 100]);
        assert!(chunks.iter().all(|c| c.total == 2437));
    }

    #[test]
    fn failure_ends_enumeration() {
        let mut items = commits(3);
        items.insert(1, Err(HistoryError::Provider("object missing".into())));
        let mut chunked = Chunked::new(items.into_iter(), 2, 3);

        assert!(matches!(chunked.next(), Some(Err(HistoryError::Provider(_)))));
        assert!(chunked.next().is_none());
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let chunks: Vec<_> = Chunked::new(commits(2).into_iter(), 0, 2).collect();
        assert_eq!(chunks.len(), 2);
    }
}
