use git2::{Repository, Signature};
use gitgraph_client::{HistoryLoader, HistorySource, HttpSource, LoadOutcome, LoaderConfig};
use gitgraph_core::memory::{linear_history, MemoryProvider};
use gitgraph_core::{GitProvider, HistoryError, HistoryProvider, PageRequest, RepoHandle, RetrievalMode};
use gitgraph_server::{Server, ServerConfig};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn spawn_server(provider: Arc<dyn HistoryProvider>) -> (HttpSource, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stop = CancellationToken::new();

    let server = Server::new(ServerConfig::default(), provider);
    let shutdown = stop.clone();
    tokio::spawn(async move {
        server
            .serve(listener, async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });

    let source = HttpSource::from_url(&format!("http://{}", addr)).unwrap();
    (source, stop)
}

fn commit_to_repo(repo: &Repository, file: &str, content: &str, message: &str) {
    let root = repo.workdir().unwrap();
    std::fs::write(root.join(file), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loader_streams_through_http() {
    let history = linear_history(12_000);
    let provider = MemoryProvider::new().with_repo("/repos/big", history.clone());
    let (source, stop) = spawn_server(Arc::new(provider)).await;

    let config = LoaderConfig {
        chunk_size: 1_000,
        page_size: 1_000,
    };
    let mut loader = HistoryLoader::new(source, config);
    let repo = RepoHandle::new("/repos/big").unwrap();

    let outcome = loader.start_load(repo, CancellationToken::new()).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::NeedsConfirmation(_)));

    let outcome = loader.confirm_mode(RetrievalMode::Paginated).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Done { loaded: 12_000, total: 12_000 });
    assert!(loader.view().commits == history);
    assert_eq!(loader.view().name, "big");

    stop.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_errors_keep_their_kind() {
    let provider = MemoryProvider::new().with_repo("/repos/small", linear_history(5));
    let (source, stop) = spawn_server(Arc::new(provider)).await;

    let missing = RepoHandle::new("/repos/missing").unwrap();
    let err = source.stats(&missing).await.unwrap_err();
    assert!(matches!(err, HistoryError::NotARepository(_)));

    let repo = RepoHandle::new("/repos/small").unwrap();
    let zero = PageRequest {
        skip: 0,
        max_count: 0,
        first_parent: false,
    };
    let err = source.fetch_page(&repo, zero).await.unwrap_err();
    assert_eq!(err, HistoryError::Validation("maxCount must be greater than zero".to_string()));

    stop.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn git_repository_over_http() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    for i in 0..3 {
        commit_to_repo(&repo, "file.txt", &format!("v{i}"), &format!("Commit {i}"));
    }

    let (source, stop) = spawn_server(Arc::new(GitProvider::new())).await;
    let handle = RepoHandle::new(dir.path()).unwrap();

    let metadata = source.metadata(&handle).await.unwrap();
    assert_eq!(metadata.stats.total_commits, 3);
    assert_eq!(metadata.stats.recommended_mode, RetrievalMode::Full);

    let mut loader = HistoryLoader::new(source, LoaderConfig::default());
    let outcome = loader.start_load(handle, CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Done { loaded: 3, total: 3 });

    let messages: Vec<&str> = loader.view().commits.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["Commit 2", "Commit 1", "Commit 0"]);

    stop.cancel();
}
