use gitgraph_core::{HistoryProvider, DEFAULT_CHUNK_SIZE};
use std::sync::Arc;

/// Shared by all handlers; requests never mutate it
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn HistoryProvider>,
    pub default_chunk_size: usize,
}

impl AppState {
    pub fn new(provider: Arc<dyn HistoryProvider>) -> Self {
        Self {
            provider,
            default_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
