//! Content agent — runs inside the target page, owns the export dialog.
//!
//! Receives `export-conversation` requests, mounts an overlay dialog, and
//! performs the export when the user confirms. All state belongs to a
//! [`PageAgent`] instance, so agents in different frames never share it.

pub mod agent;
pub mod dialog;
pub mod page;
pub mod sink;

pub use agent::{AgentState, ExportJob, PageAgent, SavedExport};
pub use dialog::{DialogHost, DialogView, HeadlessHost, RenderRoot};
pub use page::{ConversationSource, JsonFileSource, StaticSource};
pub use sink::{DirectorySink, DownloadSink};
