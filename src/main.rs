mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gitgraph_client::{HistoryLoader, HistorySource, HttpSource, LoadOutcome, LoadPhase, LocalSource};
use gitgraph_core::{
    fetch_page, repo_stats, GitProvider, HistoryProvider, PageRequest, RepoHandle, RetrievalMode,
};
use gitgraph_server::{AppState, Server};
use graph::layout::{highlight_set, Direction, DisplaySettings, LayoutCache, LayoutOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "gitgraph")]
#[command(about = "Browse large git histories as a commit graph", long_about = None)]
struct Cli {
    /// Config file (defaults to ./gitgraph.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the history endpoint over HTTP
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Show size classification of a repository
    Stats {
        /// Path to the repository
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Load history the way a viewer would, printing progress
    Load {
        /// Path to the repository
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Retrieval mode for large repositories (defaults to the recommended one)
        #[arg(long)]
        mode: Option<RetrievalMode>,
        /// Load through a running `gitgraph serve` instead of reading locally
        #[arg(long)]
        server: Option<String>,
    },
    /// Lay out recent history and print the graph as JSON
    Layout {
        /// Path to the repository
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Number of commits to lay out
        #[arg(short, long, default_value = "200")]
        limit: usize,
        #[arg(long)]
        compact: bool,
        /// Color by author instead of branch lineage
        #[arg(long)]
        by_author: bool,
        #[arg(long, value_enum, default_value = "tb")]
        direction: DirectionArg,
        /// Commits to highlight
        #[arg(long)]
        highlight: Vec<String>,
        /// Selected commit
        #[arg(long)]
        select: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Tb,
    Lr,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Tb => Direction::TopBottom,
            DirectionArg::Lr => Direction::LeftRight,
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Stats { path } => {
            let repo = RepoHandle::new(path)?;
            let stats = repo_stats(provider(), repo).await?;
            println!("Commits:          {}", stats.total_commits);
            println!("Large repository: {}", if stats.is_large_repo { "yes" } else { "no" });
            println!("Recommended mode: {}", stats.recommended_mode);
            Ok(())
        }
        Commands::Load { path, mode, server } => {
            let repo = RepoHandle::new(path)?;
            match server {
                Some(url) => {
                    let source = HttpSource::from_url(&url)?;
                    drive(HistoryLoader::new(source, config.stream), repo, mode).await
                }
                None => {
                    let source = LocalSource::new(provider());
                    drive(HistoryLoader::new(source, config.stream), repo, mode).await
                }
            }
        }
        Commands::Layout {
            path,
            limit,
            compact,
            by_author,
            direction,
            highlight,
            select,
        } => {
            let repo = RepoHandle::new(path)?;
            let request = PageRequest {
                skip: 0,
                max_count: limit,
                first_parent: false,
            };
            let page = fetch_page(provider(), repo, request).await?;

            let options = LayoutOptions {
                direction: direction.into(),
                ..LayoutOptions::default()
            };
            let settings = DisplaySettings {
                compact_mode: compact,
                color_by_author: by_author,
                highlighted_commits: highlight_set(highlight),
            };
            let model = LayoutCache::new().render(&page.commits, &options, &settings, select.as_deref());
            debug!(nodes = model.nodes.len(), edges = model.edges.len(), "graph laid out");
            println!("{}", serde_json::to_string_pretty(&model)?);
            Ok(())
        }
    }
}

fn provider() -> Arc<dyn HistoryProvider> {
    Arc::new(GitProvider::new())
}

async fn serve(config: AppConfig, bind: Option<SocketAddr>) -> Result<()> {
    let mut server_config = config.server;
    if let Some(bind) = bind {
        server_config.bind = bind;
    }

    let state = AppState {
        provider: provider(),
        default_chunk_size: config.stream.chunk_size,
    };
    let server = Server::with_state(server_config, state);
    info!(addr = %server.addr(), "starting server");

    server
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("server failed")
}

/// Run one load to completion, confirming large repositories with `mode`
/// or the recommended mode. Ctrl-C cancels the session.
async fn drive<S: HistorySource>(
    mut loader: HistoryLoader<S>,
    repo: RepoHandle,
    mode: Option<RetrievalMode>,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut status = loader.subscribe();
    let reporter = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            match current.phase {
                LoadPhase::Streaming | LoadPhase::FullLoading => {
                    eprintln!("{}: {} / {} ({})", current.phase, current.loaded, current.total, current.progress)
                }
                phase => eprintln!("{}", phase),
            }
        }
    });

    let mut outcome = loader.start_load(repo, cancel).await?;
    if let LoadOutcome::NeedsConfirmation(stats) = outcome {
        let chosen = mode.unwrap_or(stats.recommended_mode);
        println!(
            "{} commits, loading in {} mode (recommended: {})",
            stats.total_commits, chosen, stats.recommended_mode
        );
        outcome = loader.confirm_mode(chosen).await?;
    }

    let view = loader.view();
    let summary = match outcome {
        LoadOutcome::Done { loaded, total } => {
            let branch = view.current_branch.as_deref().unwrap_or("(detached)");
            println!(
                "{}: {} of {} commits on {}, {} branches, {} tags",
                view.name,
                loaded,
                total,
                branch,
                view.branches.len(),
                view.tags.len()
            );
            Ok(())
        }
        LoadOutcome::Cancelled => {
            println!("cancelled after {} commits", view.loaded_count);
            Ok(())
        }
        LoadOutcome::Failed(message) => Err(anyhow::anyhow!(
            "load failed after {} commits: {}",
            view.loaded_count,
            message
        )),
        LoadOutcome::NeedsConfirmation(_) | LoadOutcome::Unchanged => Ok(()),
    };

    drop(loader);
    let _ = reporter.await;
    summary
}
