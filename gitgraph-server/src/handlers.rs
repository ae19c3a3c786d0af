use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use gitgraph_core::{
    fetch_page, open_history_stream, repo_metadata, repo_stats, event::ErrorPayload, CommitPage,
    HistoryEvent, PageRequest, RepoHandle, RepoMetadata, RepoStats, StreamOptions,
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, pin::Pin};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 1_000;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitsQuery {
    pub path: String,
    #[serde(default)]
    pub skip: usize,
    pub max_count: Option<usize>,
    #[serde(default)]
    pub first_parent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub path: String,
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub first_parent: bool,
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> ServerResult<T> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| ServerError::BadRequest(rejection.body_text()))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn stats(
    State(state): State<AppState>,
    params: Result<Query<RepoQuery>, QueryRejection>,
) -> ServerResult<Json<RepoStats>> {
    let params = query(params)?;
    let repo = RepoHandle::new(params.path)?;
    Ok(Json(repo_stats(state.provider, repo).await?))
}

pub async fn metadata(
    State(state): State<AppState>,
    params: Result<Query<RepoQuery>, QueryRejection>,
) -> ServerResult<Json<RepoMetadata>> {
    let params = query(params)?;
    let repo = RepoHandle::new(params.path)?;
    Ok(Json(repo_metadata(state.provider, repo).await?))
}

pub async fn commits(
    State(state): State<AppState>,
    params: Result<Query<CommitsQuery>, QueryRejection>,
) -> ServerResult<Json<CommitPage>> {
    let params = query(params)?;
    let repo = RepoHandle::new(params.path)?;
    let request = PageRequest {
        skip: params.skip,
        max_count: params.max_count.unwrap_or(DEFAULT_PAGE_SIZE),
        first_parent: params.first_parent,
    };
    Ok(Json(fetch_page(state.provider, repo, request).await?))
}

pub type HistorySseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// Stream the history as named server-sent events.
///
/// Validation happens before the response starts, so a bad path is a JSON
/// error rather than an event stream.
pub async fn stream(
    State(state): State<AppState>,
    params: Result<Query<StreamQuery>, QueryRejection>,
) -> ServerResult<Sse<HistorySseStream>> {
    let params = query(params)?;
    let repo = RepoHandle::new(params.path)?;
    let options = StreamOptions {
        chunk_size: params.chunk_size.unwrap_or(state.default_chunk_size),
        first_parent: params.first_parent,
    };
    info!(repo = %repo.display(), chunk_size = options.chunk_size, first_parent = options.first_parent, "history stream requested");

    // Dropping the response body (client gone) cancels the producer
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let events = open_history_stream(state.provider, repo, options, cancel).await?;

    let stream: HistorySseStream = Box::pin(events.map(move |event| {
        let _ = &guard;
        Ok(to_sse(&event))
    }));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &HistoryEvent) -> Event {
    match event.to_json() {
        Ok(data) => Event::default().event(event.name()).data(data),
        Err(err) => {
            let payload = ErrorPayload {
                message: err.to_string(),
            };
            let data = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".into());
            Event::default().event(HistoryEvent::ERROR).data(data)
        }
    }
}

