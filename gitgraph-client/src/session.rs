use gitgraph_core::{Commit, CommitPage, HistoryEvent, RetrievalMode};
use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::view::RepositoryView;

/// Load progress as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum Progress {
    Percent(u8),
    /// No numeric progress available (size check, full load, metadata)
    Indeterminate,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Percent(p) => write!(f, "{}%", p),
            Progress::Indeterminate => f.write_str("..."),
        }
    }
}

/// What the driver should do after an event was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done,
    Failed(String),
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Step::Continue)
    }
}

/// One retrieval attempt: mode, cancellation, staging buffer and progress.
///
/// Events go through [`RetrievalSession::apply`], which is the whole
/// transition function of a load. Once a terminal step was returned, later
/// events are ignored and the same step is returned again.
#[derive(Debug)]
pub struct RetrievalSession {
    mode: RetrievalMode,
    cancel: CancellationToken,
    buffer: Vec<Commit>,
    progress: Progress,
    outcome: Option<Step>,
}

impl RetrievalSession {
    pub fn new(mode: RetrievalMode, cancel: CancellationToken) -> Self {
        Self {
            mode,
            cancel,
            buffer: Vec::new(),
            progress: Progress::Indeterminate,
            outcome: None,
        }
    }

    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Commits received but not merged into the view yet
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop anything not merged yet
    pub fn discard(&mut self) {
        if !self.buffer.is_empty() {
            debug!(discarded = self.buffer.len(), "dropping unmerged commits");
        }
        self.buffer.clear();
    }

    pub fn apply(&mut self, view: &mut RepositoryView, event: HistoryEvent) -> Step {
        if let Some(step) = &self.outcome {
            return step.clone();
        }
        if self.cancel.is_cancelled() {
            self.discard();
            return Step::Continue;
        }

        let step = match event {
            HistoryEvent::Metadata(metadata) => {
                view.apply_metadata(metadata);
                Step::Continue
            }
            HistoryEvent::Commits(batch) => {
                self.buffer.extend(batch.commits);
                self.progress = Progress::Percent(batch.progress);
                self.merge(view, batch.total);
                Step::Continue
            }
            HistoryEvent::Complete => {
                let total = view.total_count;
                self.merge(view, total);
                view.finish();
                self.progress = Progress::Percent(100);
                Step::Done
            }
            HistoryEvent::Error { message } => {
                self.discard();
                Step::Failed(message)
            }
        };

        if step.is_terminal() {
            self.outcome = Some(step.clone());
        }
        step
    }

    /// Merge one discrete page. The load is done either way; the view keeps
    /// `has_more` for a later page.
    pub fn apply_page(&mut self, view: &mut RepositoryView, page: CommitPage) -> Step {
        if let Some(step) = &self.outcome {
            return step.clone();
        }

        let exhausted = !page.has_more || page.commits.is_empty();
        self.buffer.extend(page.commits);
        self.merge(view, page.total);
        if exhausted {
            view.finish();
        }

        self.outcome = Some(Step::Done);
        Step::Done
    }

    fn merge(&mut self, view: &mut RepositoryView, total: usize) {
        let batch = std::mem::take(&mut self.buffer);
        view.append(batch, total);
    }
}
