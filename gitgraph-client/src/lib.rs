//! Consumer side of history retrieval: sources, the per-load state machine,
//! and the loader driving it.

pub mod http;
pub mod loader;
pub mod session;
pub mod source;
pub mod view;

pub use http::HttpSource;
pub use loader::{HistoryLoader, LoadOutcome, LoadPhase, LoadStatus, LoaderConfig};
pub use session::{Progress, RetrievalSession, Step};
pub use source::{HistorySource, LocalSource};
pub use view::RepositoryView;
