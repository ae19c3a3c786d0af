//! HTTP endpoint serving repository history as JSON pages and an SSE stream

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::Server;
pub use state::AppState;
