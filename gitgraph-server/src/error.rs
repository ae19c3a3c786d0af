//! Server error types and their HTTP rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gitgraph_core::HistoryError;
use serde::Serialize;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("server error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::History(err) => match err {
                HistoryError::Validation(_) => StatusCode::BAD_REQUEST,
                HistoryError::NotARepository(_) => StatusCode::NOT_FOUND,
                HistoryError::InvalidState(_) => StatusCode::CONFLICT,
                HistoryError::Transport(_) => StatusCode::BAD_GATEWAY,
                HistoryError::Provider(_) | HistoryError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message for the JSON body; validation messages go out without prefix
    fn message(&self) -> String {
        match self {
            ServerError::History(HistoryError::Validation(msg))
            | ServerError::History(HistoryError::Provider(msg))
            | ServerError::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn history_errors_map_to_status_codes() {
        let cases = [
            (HistoryError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (HistoryError::NotARepository(PathBuf::from("/x")), StatusCode::NOT_FOUND),
            (HistoryError::Provider("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn validation_message_is_bare() {
        let err = ServerError::from(HistoryError::Validation("maxCount must be greater than zero".into()));
        assert_eq!(err.message(), "maxCount must be greater than zero");
    }
}
