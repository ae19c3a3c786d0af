//! Streaming protocol endpoint.
//!
//! Turns a [`HistoryProvider`] enumeration into an ordered event stream:
//! one `metadata`, then `commits` chunks, then exactly one terminal event.
//! Each call enumerates from offset 0 and shares nothing with other calls.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{classify, RepoStats};
use crate::error::{HistoryError, HistoryResult};
use crate::event::{CommitBatch, HistoryEvent};
use crate::model::{CommitPage, PageRequest, RepoHandle, RepoMetadata, StreamOptions};
use crate::provider::HistoryProvider;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const MAX_CHUNK_SIZE: usize = 10_000;

/// Events buffered between the producer and a slow consumer
const EVENT_BUFFER: usize = 4;

/// Cumulative progress of `loaded` out of `total`, clamped to 100
pub fn progress_percent(loaded: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (loaded.saturating_mul(100) / total).min(100) as u8
}

/// Clamp caller-supplied stream parameters into the supported range
pub fn normalize_options(options: StreamOptions) -> StreamOptions {
    StreamOptions {
        chunk_size: options.chunk_size.clamp(1, MAX_CHUNK_SIZE),
        first_parent: options.first_parent,
    }
}

async fn blocking<T, F>(work: F) -> HistoryResult<T>
where
    F: FnOnce() -> HistoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| HistoryError::Provider(format!("history worker failed: {}", err)))?
}

/// Size classification of the whole history
pub async fn repo_stats(provider: Arc<dyn HistoryProvider>, repo: RepoHandle) -> HistoryResult<RepoStats> {
    blocking(move || Ok(classify(provider.total_count(&repo, false)?))).await
}

/// Identity, refs and size classification
pub async fn repo_metadata(provider: Arc<dyn HistoryProvider>, repo: RepoHandle) -> HistoryResult<RepoMetadata> {
    blocking(move || load_metadata(provider.as_ref(), &repo)).await
}

fn load_metadata(provider: &dyn HistoryProvider, repo: &RepoHandle) -> HistoryResult<RepoMetadata> {
    let descriptor = provider.describe(repo)?;
    let stats = classify(provider.total_count(repo, false)?);
    Ok(RepoMetadata::new(descriptor, stats))
}

/// One discrete page; `has_more = skip + commits.len() < total`
pub async fn fetch_page(
    provider: Arc<dyn HistoryProvider>,
    repo: RepoHandle,
    request: PageRequest,
) -> HistoryResult<CommitPage> {
    if request.max_count == 0 {
        return Err(HistoryError::Validation("maxCount must be greater than zero".to_string()));
    }

    let mut page = blocking(move || provider.page(&repo, &request)).await?;
    page.has_more = request.skip + page.commits.len() < page.total;
    Ok(page)
}

/// Open a history stream.
///
/// The repository is validated and described before this returns, so a bad
/// handle is rejected synchronously and never produces a stream. After that,
/// every failure is delivered as a terminal `Error` event. The producer stops
/// between chunks once `cancel` fires or the receiving side is dropped.
pub async fn open_history_stream(
    provider: Arc<dyn HistoryProvider>,
    repo: RepoHandle,
    options: StreamOptions,
    cancel: CancellationToken,
) -> HistoryResult<ReceiverStream<HistoryEvent>> {
    let options = normalize_options(options);
    let metadata = {
        let provider = Arc::clone(&provider);
        let repo = repo.clone();
        blocking(move || load_metadata(provider.as_ref(), &repo)).await?
    };

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::task::spawn_blocking(move || produce(provider.as_ref(), &repo, options, metadata, &cancel, &tx));
    Ok(ReceiverStream::new(rx))
}

enum Flow {
    Finished { chunks: usize, loaded: usize },
    Stopped,
}

fn produce(
    provider: &dyn HistoryProvider,
    repo: &RepoHandle,
    options: StreamOptions,
    metadata: RepoMetadata,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<HistoryEvent>,
) {
    if tx.blocking_send(HistoryEvent::Metadata(metadata)).is_err() {
        debug!(repo = %repo.display(), "stream receiver gone before metadata");
        return;
    }

    let terminal = match send_chunks(provider, repo, options, cancel, tx) {
        Ok(Flow::Finished { chunks, loaded }) => {
            info!(repo = %repo.display(), chunks, loaded, "history stream complete");
            HistoryEvent::Complete
        }
        Ok(Flow::Stopped) => {
            debug!(repo = %repo.display(), "history stream stopped early");
            return;
        }
        Err(err) => {
            warn!(repo = %repo.display(), error = %err, "history stream failed");
            HistoryEvent::Error {
                message: err.to_string(),
            }
        }
    };

    // Nothing follows the terminal event; a vanished receiver is fine here
    let _ = tx.blocking_send(terminal);
}

fn send_chunks(
    provider: &dyn HistoryProvider,
    repo: &RepoHandle,
    options: StreamOptions,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<HistoryEvent>,
) -> HistoryResult<Flow> {
    let mut chunks = 0;
    let mut loaded = 0;
    let mut last_progress = 0u8;

    for chunk in provider.chunks(repo, &options)? {
        if cancel.is_cancelled() || tx.is_closed() {
            return Ok(Flow::Stopped);
        }

        let chunk = chunk?;
        if chunk.commits.is_empty() {
            continue;
        }

        loaded += chunk.commits.len();
        chunks += 1;
        last_progress = chunk.progress_percent.min(100).max(last_progress);

        let batch = CommitBatch {
            commits: chunk.commits,
            progress: last_progress,
            total: chunk.total,
        };
        if tx.blocking_send(HistoryEvent::Commits(batch)).is_err() {
            return Ok(Flow::Stopped);
        }
    }

    if cancel.is_cancelled() {
        return Ok(Flow::Stopped);
    }
    Ok(Flow::Finished { chunks, loaded })
}
