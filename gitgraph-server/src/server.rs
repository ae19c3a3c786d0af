use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use gitgraph_core::HistoryProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handlers;
use crate::state::AppState;

/// HTTP front of the history endpoint
pub struct Server {
    config: ServerConfig,
    app: Router,
}

impl Server {
    pub fn new(config: ServerConfig, provider: Arc<dyn HistoryProvider>) -> Self {
        Self::with_state(config, AppState::new(provider))
    }

    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        let app = Self::build_app(state, &config);
        Self { config, app }
    }

    /// Routes plus tracing and CORS layers
    pub fn build_app(state: AppState, config: &ServerConfig) -> Router {
        let cors = if config.enable_cors {
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost:3000"),
                    HeaderValue::from_static("http://127.0.0.1:3000"),
                ])
                .allow_methods([Method::GET])
        };
        let middleware = ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors);

        let api = Router::new()
            .route("/health", get(handlers::health))
            .route("/repo/stats", get(handlers::stats))
            .route("/repo/metadata", get(handlers::metadata))
            .route("/repo/commits", get(handlers::commits))
            .route("/repo/stream", get(handlers::stream));

        Router::new()
            .nest("/api", api)
            .with_state(state)
            .layer(middleware)
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn addr(&self) -> SocketAddr {
        self.config.bind
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "gitgraph server listening");
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Internal(format!("server error: {err}")))
    }
}
