use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, HistoryResult};
use crate::model::{Commit, RepoMetadata};

/// Payload of the `commits` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitBatch {
    pub commits: Vec<Commit>,
    /// Cumulative progress, 0..=100, never decreasing within a stream
    pub progress: u8,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// One event of a history stream.
///
/// A well-formed stream is `Metadata`, then any number of `Commits`, then
/// exactly one of `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Metadata(RepoMetadata),
    Commits(CommitBatch),
    Complete,
    Error { message: String },
}

impl HistoryEvent {
    pub const METADATA: &'static str = "metadata";
    pub const COMMITS: &'static str = "commits";
    pub const COMPLETE: &'static str = "complete";
    pub const ERROR: &'static str = "error";

    pub fn is_terminal(&self) -> bool {
        matches!(self, HistoryEvent::Complete | HistoryEvent::Error { .. })
    }

    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            HistoryEvent::Metadata(_) => Self::METADATA,
            HistoryEvent::Commits(_) => Self::COMMITS,
            HistoryEvent::Complete => Self::COMPLETE,
            HistoryEvent::Error { .. } => Self::ERROR,
        }
    }

    /// JSON data carried by the event on the wire
    pub fn to_json(&self) -> HistoryResult<String> {
        let data = match self {
            HistoryEvent::Metadata(metadata) => serde_json::to_string(metadata)?,
            HistoryEvent::Commits(batch) => serde_json::to_string(batch)?,
            HistoryEvent::Complete => "{}".to_string(),
            HistoryEvent::Error { message } => serde_json::to_string(&ErrorPayload {
                message: message.clone(),
            })?,
        };
        Ok(data)
    }

    /// Rebuild an event from its wire name and JSON data
    pub fn from_wire(name: &str, data: &str) -> HistoryResult<Self> {
        match name {
            Self::METADATA => Ok(HistoryEvent::Metadata(serde_json::from_str(data)?)),
            Self::COMMITS => Ok(HistoryEvent::Commits(serde_json::from_str(data)?)),
            Self::COMPLETE => Ok(HistoryEvent::Complete),
            Self::ERROR => {
                let payload: ErrorPayload = serde_json::from_str(data)?;
                Ok(HistoryEvent::Error {
                    message: payload.message,
                })
            }
            other => Err(HistoryError::Transport(format!("unknown event '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::sample_commit;

    #[test]
    fn terminal_events() {
        assert!(HistoryEvent::Complete.is_terminal());
        assert!(HistoryEvent::Error { message: "x".into() }.is_terminal());
        let batch = CommitBatch { commits: vec![], progress: 0, total: 0 };
        assert!(!HistoryEvent::Commits(batch).is_terminal());
    }

    #[test]
    fn complete_carries_empty_object() {
        assert_eq!(HistoryEvent::Complete.to_json().unwrap(), "{}");
        assert_eq!(
            HistoryEvent::Error { message: "disk full".into() }.to_json().unwrap(),
            r#"{"message":"disk full"}"#
        );
    }

    #[test]
    fn commits_survive_the_wire() {
        let event = HistoryEvent::Commits(CommitBatch {
            commits: vec![sample_commit("a1", &["b2"])],
            progress: 50,
            total: 2,
        });
        let data = event.to_json().unwrap();
        assert!(data.contains(r#""progress":50"#));
        assert_eq!(HistoryEvent::from_wire(event.name(), &data).unwrap(), event);
    }

    #[test]
    fn unknown_event_is_a_transport_error() {
        assert!(matches!(
            HistoryEvent::from_wire("heartbeat", "{}"),
            Err(HistoryError::Transport(_))
        ));
        assert!(matches!(
            HistoryEvent::from_wire("commits", "not json"),
            Err(HistoryError::Transport(_))
        ));
    }
}
