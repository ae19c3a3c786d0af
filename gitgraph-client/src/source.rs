use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use gitgraph_core::{
    fetch_page, open_history_stream, repo_metadata, repo_stats, CommitPage, GitProvider,
    HistoryEvent, HistoryProvider, HistoryResult, PageRequest, RepoHandle, RepoMetadata,
    RepoStats, StreamOptions,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where a loader gets history from
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn stats(&self, repo: &RepoHandle) -> HistoryResult<RepoStats>;

    async fn metadata(&self, repo: &RepoHandle) -> HistoryResult<RepoMetadata>;

    /// Open an event stream. Failing here means no event was produced.
    async fn open_stream(
        &self,
        repo: &RepoHandle,
        options: StreamOptions,
        cancel: CancellationToken,
    ) -> HistoryResult<BoxStream<'static, HistoryEvent>>;

    async fn fetch_page(&self, repo: &RepoHandle, request: PageRequest) -> HistoryResult<CommitPage>;
}

/// In-process source backed by a history provider
#[derive(Clone)]
pub struct LocalSource {
    provider: Arc<dyn HistoryProvider>,
}

impl LocalSource {
    pub fn new(provider: Arc<dyn HistoryProvider>) -> Self {
        Self { provider }
    }

    /// Source reading repositories on disk
    pub fn git() -> Self {
        Self::new(Arc::new(GitProvider::new()))
    }
}

#[async_trait]
impl HistorySource for LocalSource {
    async fn stats(&self, repo: &RepoHandle) -> HistoryResult<RepoStats> {
        repo_stats(Arc::clone(&self.provider), repo.clone()).await
    }

    async fn metadata(&self, repo: &RepoHandle) -> HistoryResult<RepoMetadata> {
        repo_metadata(Arc::clone(&self.provider), repo.clone()).await
    }

    async fn open_stream(
        &self,
        repo: &RepoHandle,
        options: StreamOptions,
        cancel: CancellationToken,
    ) -> HistoryResult<BoxStream<'static, HistoryEvent>> {
        let events = open_history_stream(Arc::clone(&self.provider), repo.clone(), options, cancel).await?;
        Ok(events.boxed())
    }

    async fn fetch_page(&self, repo: &RepoHandle, request: PageRequest) -> HistoryResult<CommitPage> {
        fetch_page(Arc::clone(&self.provider), repo.clone(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgraph_core::memory::{linear_history, MemoryProvider};
    use gitgraph_core::{HistoryError, RetrievalMode};

    fn source() -> LocalSource {
        LocalSource::new(Arc::new(MemoryProvider::new().with_repo("/repo", linear_history(25))))
    }

    #[tokio::test]
    async fn local_source_reports_stats() {
        let repo = RepoHandle::new("/repo").unwrap();
        let stats = source().stats(&repo).await.unwrap();
        assert_eq!(stats.total_commits, 25);
        assert_eq!(stats.recommended_mode, RetrievalMode::Full);
    }

    #[tokio::test]
    async fn local_stream_ends_with_complete() {
        let repo = RepoHandle::new("/repo").unwrap();
        let options = StreamOptions {
            chunk_size: 10,
            first_parent: false,
        };
        let events: Vec<HistoryEvent> = source()
            .open_stream(&repo, options, CancellationToken::new())
            .await
            .unwrap()
            .collect()
            .await;

        assert!(matches!(events.first(), Some(HistoryEvent::Metadata(_))));
        assert_eq!(events.last(), Some(&HistoryEvent::Complete));
        assert_eq!(events.len(), 1 + 3 + 1);
    }

    #[tokio::test]
    async fn unknown_repo_fails_before_streaming() {
        let repo = RepoHandle::new("/elsewhere").unwrap();
        let err = source()
            .open_stream(&repo, StreamOptions::default(), CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, HistoryError::NotARepository(_)));
        assert!(err.is_validation());
    }
}
