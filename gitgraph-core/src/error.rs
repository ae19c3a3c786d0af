use std::path::PathBuf;

/// Result alias used across the retrieval pipeline
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Failures of the history retrieval pipeline.
///
/// `Validation` and `NotARepository` are raised before any stream or session
/// exists. Everything that goes wrong after a stream started is delivered as
/// an `error` event instead of one of these values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("history provider failed: {0}")]
    Provider(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Deliberate stop requested by the caller
    #[error("load cancelled")]
    Cancelled,
}

impl HistoryError {
    /// Errors that are the caller's fault and must never trigger a fallback
    pub fn is_validation(&self) -> bool {
        matches!(self, HistoryError::Validation(_) | HistoryError::NotARepository(_))
    }
}

impl From<git2::Error> for HistoryError {
    fn from(err: git2::Error) -> Self {
        HistoryError::Provider(err.message().to_string())
    }
}

impl From<anyhow::Error> for HistoryError {
    fn from(err: anyhow::Error) -> Self {
        HistoryError::Provider(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Transport(format!("malformed payload: {}", err))
    }
}
