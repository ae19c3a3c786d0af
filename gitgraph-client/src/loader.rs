use futures::StreamExt;
use gitgraph_core::{
    HistoryError, HistoryResult, PageRequest, RepoHandle, RepoStats, RetrievalMode, StreamOptions,
    DEFAULT_CHUNK_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::{Progress, RetrievalSession, Step};
use crate::source::HistorySource;
use crate::view::RepositoryView;

/// Chunk and page sizes used by a loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub chunk_size: usize,
    pub page_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            page_size: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    CheckingSize,
    AwaitingConfirmation,
    Streaming,
    FullLoading,
    Done,
    Failed(String),
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Idle => f.write_str("idle"),
            LoadPhase::CheckingSize => f.write_str("checking size"),
            LoadPhase::AwaitingConfirmation => f.write_str("awaiting confirmation"),
            LoadPhase::Streaming => f.write_str("streaming"),
            LoadPhase::FullLoading => f.write_str("loading"),
            LoadPhase::Done => f.write_str("done"),
            LoadPhase::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// Snapshot published to subscribers after every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStatus {
    pub phase: LoadPhase,
    pub mode: Option<RetrievalMode>,
    pub progress: Progress,
    pub loaded: usize,
    pub total: usize,
}

impl Default for LoadStatus {
    fn default() -> Self {
        Self {
            phase: LoadPhase::Idle,
            mode: None,
            progress: Progress::Indeterminate,
            loaded: 0,
            total: 0,
        }
    }
}

/// How a loader call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Large repository: pick a mode with [`HistoryLoader::confirm_mode`]
    NeedsConfirmation(RepoStats),
    Done { loaded: usize, total: usize },
    Failed(String),
    Cancelled,
    /// Nothing to do
    Unchanged,
}

/// Drives history retrieval for one repository view.
///
/// At most one session exists at a time; starting a load cancels the
/// previous one before the view is touched. Cancellation is cooperative:
/// the caller owns the token passed to [`HistoryLoader::start_load`] and may
/// fire it from any task.
pub struct HistoryLoader<S> {
    source: S,
    config: LoaderConfig,
    view: RepositoryView,
    repo: Option<RepoHandle>,
    session: Option<RetrievalSession>,
    cancel: CancellationToken,
    first_parent: bool,
    phase: LoadPhase,
    mode: Option<RetrievalMode>,
    progress: Progress,
    status: watch::Sender<LoadStatus>,
}

impl<S: HistorySource> HistoryLoader<S> {
    pub fn new(source: S, config: LoaderConfig) -> Self {
        let (status, _) = watch::channel(LoadStatus::default());
        Self {
            source,
            config,
            view: RepositoryView::default(),
            repo: None,
            session: None,
            cancel: CancellationToken::new(),
            first_parent: false,
            phase: LoadPhase::Idle,
            mode: None,
            progress: Progress::Indeterminate,
            status,
        }
    }

    pub fn view(&self) -> &RepositoryView {
        &self.view
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn status(&self) -> LoadStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadStatus> {
        self.status.subscribe()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Check the repository size, then either load everything or stop and
    /// ask for a retrieval mode.
    pub async fn start_load(&mut self, repo: RepoHandle, cancel: CancellationToken) -> HistoryResult<LoadOutcome> {
        self.cancel();
        self.cancel = cancel.clone();
        self.mode = None;
        self.first_parent = false;
        self.set_phase(LoadPhase::CheckingSize, Progress::Indeterminate);
        info!(repo = %repo.display(), "loading history");

        // The previous view survives until the new repository checks out
        let stats = match until_cancelled(&cancel, self.source.stats(&repo)).await {
            None => return Ok(self.cancelled()),
            Some(Ok(stats)) => stats,
            Some(Err(err)) => return Err(self.reject(err)),
        };
        self.view = RepositoryView::for_repo(&repo);
        self.repo = Some(repo);
        self.view.stats = Some(stats);
        self.view.total_count = stats.total_commits;

        if stats.is_large_repo {
            info!(
                total = stats.total_commits,
                recommended = %stats.recommended_mode,
                "large repository, waiting for mode"
            );
            self.mode = Some(stats.recommended_mode);
            self.set_phase(LoadPhase::AwaitingConfirmation, Progress::Indeterminate);
            return Ok(LoadOutcome::NeedsConfirmation(stats));
        }

        self.run(RetrievalMode::Full).await
    }

    /// Continue a large-repository load with the chosen mode
    pub async fn confirm_mode(&mut self, mode: RetrievalMode) -> HistoryResult<LoadOutcome> {
        if self.phase != LoadPhase::AwaitingConfirmation {
            return Err(HistoryError::InvalidState(format!(
                "cannot choose a retrieval mode while {}",
                self.phase
            )));
        }
        self.run(mode).await
    }

    /// Stop the current load. Merged commits stay, buffered ones are dropped.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if let Some(mut session) = self.session.take() {
            session.discard();
            debug!(mode = %session.mode(), "session cancelled");
        }
        if self.phase != LoadPhase::Idle {
            self.set_phase(LoadPhase::Idle, Progress::Indeterminate);
        }
    }

    /// Append the next page after a finished load that did not get everything.
    /// Once the load's token has fired nothing more is fetched.
    pub async fn load_more(&mut self) -> HistoryResult<LoadOutcome> {
        if self.phase != LoadPhase::Done || !self.view.has_more() {
            return Ok(LoadOutcome::Unchanged);
        }
        let Some(repo) = self.repo.clone() else {
            return Ok(LoadOutcome::Unchanged);
        };

        let request = PageRequest {
            skip: self.view.loaded_count,
            max_count: self.config.page_size.max(1),
            first_parent: self.first_parent,
        };
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled());
        }
        let cancel = self.cancel.clone();
        let page = match until_cancelled(&cancel, self.source.fetch_page(&repo, request)).await {
            None => return Ok(self.cancelled()),
            Some(page) => page?,
        };
        debug!(skip = request.skip, received = page.commits.len(), "loaded next page");

        let exhausted = !page.has_more || page.commits.is_empty();
        self.view.append(page.commits, page.total);
        if exhausted {
            self.view.finish();
        }
        self.publish();
        Ok(self.outcome_done())
    }

    async fn run(&mut self, mode: RetrievalMode) -> HistoryResult<LoadOutcome> {
        let Some(repo) = self.repo.clone() else {
            return Err(HistoryError::InvalidState("no repository selected".to_string()));
        };
        let cancel = self.cancel.clone();
        self.mode = Some(mode);
        self.first_parent = mode.first_parent();
        self.session = Some(RetrievalSession::new(mode, cancel.clone()));
        info!(repo = %repo.display(), %mode, "retrieval started");

        if mode.is_streaming() {
            self.stream(repo, cancel).await
        } else {
            self.full_load(repo, cancel).await
        }
    }

    async fn stream(&mut self, repo: RepoHandle, cancel: CancellationToken) -> HistoryResult<LoadOutcome> {
        self.set_phase(LoadPhase::Streaming, Progress::Indeterminate);
        let options = StreamOptions {
            chunk_size: self.config.chunk_size,
            first_parent: self.first_parent,
        };

        let opened = until_cancelled(&cancel, self.source.open_stream(&repo, options, cancel.clone())).await;
        let mut events = match opened {
            None => return Ok(self.cancelled()),
            Some(Ok(events)) => events,
            Some(Err(err)) if err.is_validation() => return Err(self.reject(err)),
            Some(Err(err)) => {
                warn!(error = %err, "history stream unavailable, falling back to pages");
                return self.first_page(repo, cancel).await;
            }
        };

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled()),
                event = events.next() => event,
            };
            let Some(event) = event else {
                return Ok(self.fail("history stream ended before completion".to_string()));
            };

            let step = match self.session.as_mut() {
                Some(session) => {
                    let step = session.apply(&mut self.view, event);
                    self.progress = session.progress();
                    step
                }
                None => return Ok(LoadOutcome::Cancelled),
            };
            self.publish();

            match step {
                Step::Continue => {}
                Step::Done => return Ok(self.done()),
                Step::Failed(message) => return Ok(self.fail(message)),
            }
        }
    }

    async fn full_load(&mut self, repo: RepoHandle, cancel: CancellationToken) -> HistoryResult<LoadOutcome> {
        self.set_phase(LoadPhase::FullLoading, Progress::Indeterminate);

        let metadata = match until_cancelled(&cancel, self.source.metadata(&repo)).await {
            None => return Ok(self.cancelled()),
            Some(Ok(metadata)) => metadata,
            Some(Err(err)) if err.is_validation() => return Err(self.reject(err)),
            Some(Err(err)) => return Ok(self.fail(err.to_string())),
        };
        let total = metadata.stats.total_commits;
        self.view.apply_metadata(metadata);

        let request = PageRequest {
            skip: 0,
            max_count: total.max(1),
            first_parent: false,
        };
        self.apply_first_page(repo, request, cancel).await
    }

    /// Fallback when a stream could not be opened
    async fn first_page(&mut self, repo: RepoHandle, cancel: CancellationToken) -> HistoryResult<LoadOutcome> {
        let request = PageRequest {
            skip: 0,
            max_count: self.config.page_size.max(1),
            first_parent: self.first_parent,
        };
        self.apply_first_page(repo, request, cancel).await
    }

    async fn apply_first_page(
        &mut self,
        repo: RepoHandle,
        request: PageRequest,
        cancel: CancellationToken,
    ) -> HistoryResult<LoadOutcome> {
        let page = match until_cancelled(&cancel, self.source.fetch_page(&repo, request)).await {
            None => return Ok(self.cancelled()),
            Some(Ok(page)) => page,
            Some(Err(err)) if err.is_validation() => return Err(self.reject(err)),
            Some(Err(err)) => return Ok(self.fail(err.to_string())),
        };

        match self.session.as_mut() {
            Some(session) => {
                session.apply_page(&mut self.view, page);
            }
            None => return Ok(LoadOutcome::Cancelled),
        }
        Ok(self.done())
    }

    fn done(&mut self) -> LoadOutcome {
        self.session = None;
        self.set_phase(LoadPhase::Done, Progress::Percent(100));
        info!(
            loaded = self.view.loaded_count,
            total = self.view.total_count,
            "history loaded"
        );
        self.outcome_done()
    }

    fn outcome_done(&self) -> LoadOutcome {
        LoadOutcome::Done {
            loaded: self.view.loaded_count,
            total: self.view.total_count,
        }
    }

    fn fail(&mut self, message: String) -> LoadOutcome {
        warn!(error = %message, loaded = self.view.loaded_count, "history load failed");
        if let Some(mut session) = self.session.take() {
            session.discard();
        }
        let progress = self.progress;
        self.set_phase(LoadPhase::Failed(message.clone()), progress);
        LoadOutcome::Failed(message)
    }

    fn cancelled(&mut self) -> LoadOutcome {
        self.cancel();
        LoadOutcome::Cancelled
    }

    /// Caller errors end the attempt without a session
    fn reject(&mut self, err: HistoryError) -> HistoryError {
        if let Some(mut session) = self.session.take() {
            session.discard();
        }
        if err.is_validation() {
            self.set_phase(LoadPhase::Idle, Progress::Indeterminate);
        } else {
            self.set_phase(LoadPhase::Failed(err.to_string()), Progress::Indeterminate);
        }
        err
    }

    fn set_phase(&mut self, phase: LoadPhase, progress: Progress) {
        debug!(from = %self.phase, to = %phase, "load phase");
        self.phase = phase;
        self.progress = progress;
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(LoadStatus {
            phase: self.phase.clone(),
            mode: self.mode,
            progress: self.progress,
            loaded: self.view.loaded_count,
            total: self.view.total_count,
        });
    }
}

/// `None` when `cancel` fires first
async fn until_cancelled<T>(cancel: &CancellationToken, work: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = work => Some(out),
    }
}
