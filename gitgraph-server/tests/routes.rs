use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use gitgraph_core::memory::{linear_history, MemoryProvider};
use gitgraph_server::{Server, ServerConfig};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app(commits: usize) -> Router {
    let provider = MemoryProvider::new().with_repo("/repos/demo", linear_history(commits));
    Server::new(ServerConfig::default(), Arc::new(provider)).router()
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = get_json(app(1), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn stats_classify_the_repository() {
    let (status, body) = get_json(app(12_000), "/api/repo/stats?path=/repos/demo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCommits"], 12_000);
    assert_eq!(body["isLargeRepo"], true);
    assert_eq!(body["recommendedMode"], "paginated");
}

#[tokio::test]
async fn unknown_repository_is_not_found() {
    let (status, body) = get_json(app(1), "/api/repo/metadata?path=/repos/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("/repos/missing"));
}

#[tokio::test]
async fn missing_path_is_bad_request() {
    let (status, body) = get_json(app(1), "/api/repo/stats").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn pages_report_has_more() {
    let (status, body) = get_json(app(25), "/api/repo/commits?path=/repos/demo&skip=10&maxCount=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["commits"].as_array().unwrap().len(), 10);
    assert_eq!(body["total"], 25);
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["commits"][0]["hash"], "c14");
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let (_, body) = get_json(app(25), "/api/repo/commits?path=/repos/demo&skip=25&maxCount=10").await;
    assert_eq!(body["commits"].as_array().unwrap().len(), 0);
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn zero_page_size_is_rejected() {
    let (status, body) = get_json(app(25), "/api/repo/commits?path=/repos/demo&maxCount=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "maxCount must be greater than zero");
}

#[tokio::test]
async fn stream_emits_named_events_in_order() {
    let (status, body) = get(app(25), "/api/repo/stream?path=/repos/demo&chunkSize=10").await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("event: ").or_else(|| line.strip_prefix("event:")))
        .map(str::trim)
        .collect();
    assert_eq!(names, vec!["metadata", "commits", "commits", "commits", "complete"]);

    let data: Vec<Value> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .map(|d| serde_json::from_str(d.trim()).unwrap())
        .collect();
    let progress: Vec<u64> = data[1..4].iter().map(|d| d["progress"].as_u64().unwrap()).collect();
    assert_eq!(progress, vec![40, 80, 100]);
    assert_eq!(data[4], serde_json::json!({}));
}

#[tokio::test]
async fn stream_for_unknown_repository_is_json_error() {
    let (status, body) = get_json(app(1), "/api/repo/stream?path=/repos/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
