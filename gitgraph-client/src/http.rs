//! History source talking to a `gitgraph serve` instance

use async_trait::async_trait;
use eventsource_client::{Client, ClientBuilder, ReconnectOptions, SSE};
use futures::stream::{self, BoxStream, StreamExt};
use gitgraph_core::{
    CommitPage, HistoryError, HistoryEvent, HistoryResult, PageRequest, RepoHandle, RepoMetadata,
    RepoStats, StreamOptions,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::source::HistorySource;

const EVENT_BUFFER: usize = 16;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    http: HttpClient,
    base_url: Url,
}

impl HttpSource {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: HttpClient::new(),
            base_url,
        }
    }

    pub fn from_url(base_url: &str) -> HistoryResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| HistoryError::Validation(format!("bad server url '{}': {}", base_url, e)))?;
        Ok(Self::new(base_url))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> HistoryResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| HistoryError::Validation(e.to_string()))?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, repo: &RepoHandle) -> HistoryResult<T> {
        debug!(%url, "GET");
        let response = self.http.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if status.is_success() {
            Ok(serde_json::from_str(&text)?)
        } else {
            Err(error_from_status(status, &text, repo))
        }
    }
}

fn transport(err: reqwest::Error) -> HistoryError {
    HistoryError::Transport(err.to_string())
}

/// Undo the server's status mapping
fn error_from_status(status: StatusCode, body: &str, repo: &RepoHandle) -> HistoryError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::BAD_REQUEST => HistoryError::Validation(message),
        StatusCode::NOT_FOUND => HistoryError::NotARepository(repo.path().to_path_buf()),
        s if s.is_server_error() => HistoryError::Provider(message),
        s => HistoryError::Transport(format!("{}: {}", s, message)),
    }
}

fn path_query(repo: &RepoHandle) -> (&'static str, String) {
    ("path", repo.display())
}

#[async_trait]
impl HistorySource for HttpSource {
    async fn stats(&self, repo: &RepoHandle) -> HistoryResult<RepoStats> {
        let url = self.endpoint("/api/repo/stats", &[path_query(repo)])?;
        self.get_json(url, repo).await
    }

    async fn metadata(&self, repo: &RepoHandle) -> HistoryResult<RepoMetadata> {
        let url = self.endpoint("/api/repo/metadata", &[path_query(repo)])?;
        self.get_json(url, repo).await
    }

    async fn open_stream(
        &self,
        repo: &RepoHandle,
        options: StreamOptions,
        cancel: CancellationToken,
    ) -> HistoryResult<BoxStream<'static, HistoryEvent>> {
        let url = self.endpoint(
            "/api/repo/stream",
            &[
                path_query(repo),
                ("chunkSize", options.chunk_size.to_string()),
                ("firstParent", options.first_parent.to_string()),
            ],
        )?;

        let client = ClientBuilder::for_url(url.as_str())
            .map_err(|e| HistoryError::Transport(e.to_string()))?
            .reconnect(ReconnectOptions::reconnect(false).build())
            .build();

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump(client, tx, cancel));

        // A stream that cannot produce its first event never opened
        let first = match rx.recv().await {
            Some(Ok(event)) => event,
            Some(Err(err)) => return Err(err),
            None => {
                return Err(HistoryError::Transport(
                    "event stream closed before any event".to_string(),
                ))
            }
        };

        let rest = ReceiverStream::new(rx).map(|item| {
            item.unwrap_or_else(|err| HistoryEvent::Error {
                message: err.to_string(),
            })
        });
        Ok(stream::once(async move { first }).chain(rest).boxed())
    }

    async fn fetch_page(&self, repo: &RepoHandle, request: PageRequest) -> HistoryResult<CommitPage> {
        let url = self.endpoint(
            "/api/repo/commits",
            &[
                path_query(repo),
                ("skip", request.skip.to_string()),
                ("maxCount", request.max_count.to_string()),
                ("firstParent", request.first_parent.to_string()),
            ],
        )?;
        self.get_json(url, repo).await
    }
}

/// Decode server-sent events until the terminal one, a failure, or cancellation
async fn pump(
    client: impl Client,
    tx: mpsc::Sender<HistoryResult<HistoryEvent>>,
    cancel: CancellationToken,
) {
    let mut events = client.stream();
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("history stream cancelled");
                break;
            }
            item = events.next() => item,
        };
        let Some(item) = item else {
            break;
        };

        let decoded = match item {
            Ok(SSE::Event(ev)) => HistoryEvent::from_wire(&ev.event_type, &ev.data),
            Ok(_) => continue,
            Err(err) => {
                warn!(error = %err, "event stream failed");
                Err(HistoryError::Transport(err.to_string()))
            }
        };

        let stop = decoded.as_ref().map_or(true, HistoryEvent::is_terminal);
        if tx.send(decoded).await.is_err() || stop {
            break;
        }
    }
}
