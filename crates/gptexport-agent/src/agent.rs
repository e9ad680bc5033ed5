//! Page agent state machine.
//!
//! ```text
//! Idle --request--> DialogMounted --confirm--> Exporting --done--> AwaitingClose --close--> Idle
//!                   DialogMounted --cancel--> Idle
//!                   Exporting --failure--> DialogMounted (controls re-enabled, error shown)
//! ```

use std::sync::Arc;

use gptexport_core::{Error, Result};
use gptexport_encode::{render, suggested_filename};
use gptexport_protocol::{ExportRequest, ExportResponse, Reply, Request, Toast, Toaster};
use tracing::{error, info, warn};

use crate::dialog::{DialogHost, DialogView, RenderRoot};
use crate::page::ConversationSource;
use crate::sink::DownloadSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    DialogMounted,
    Exporting,
    AwaitingClose,
}

/// One mount cycle of the dialog: the request it serves and its root.
struct DialogSession {
    request: ExportRequest,
    view: DialogView,
    root: Box<dyn RenderRoot>,
}

impl DialogSession {
    fn redraw(&mut self) {
        self.root.render(&self.view);
    }
}

/// Result of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedExport {
    pub filename: String,
    pub location: String,
    pub bytes: usize,
}

pub struct PageAgent {
    host: Arc<dyn DialogHost>,
    source: Arc<dyn ConversationSource>,
    sink: Arc<dyn DownloadSink>,
    toaster: Arc<dyn Toaster>,
    state: AgentState,
    session: Option<DialogSession>,
}

impl PageAgent {
    pub fn new(
        host: Arc<dyn DialogHost>,
        source: Arc<dyn ConversationSource>,
        sink: Arc<dyn DownloadSink>,
        toaster: Arc<dyn Toaster>,
    ) -> Self {
        Self {
            host,
            source,
            sink,
            toaster,
            state: AgentState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn view(&self) -> Option<&DialogView> {
        self.session.as_ref().map(|s| &s.view)
    }

    /// Entry point for every channel addressed to a content agent.
    pub fn handle(&mut self, request: Request) -> Reply {
        match request {
            Request::ExportConversation(req) => Reply::Export(self.on_export_request(req)),
            Request::PopupExport(_) => {
                warn!("popup-export delivered to a content agent");
                Reply::Export(ExportResponse::failed(
                    "popup-export must be sent to the background",
                ))
            }
        }
    }

    /// Mount the dialog for `request` and acknowledge at once. The reply
    /// confirms the dialog opened, not that the export finished.
    pub fn on_export_request(&mut self, request: ExportRequest) -> ExportResponse {
        info!(
            "Export request: format={} user={} assistant={}",
            request.format, request.include_messages.user, request.include_messages.assistant
        );

        if let Err(e) = request.validate() {
            return ExportResponse::failed(e.to_string());
        }

        match self.state {
            AgentState::Exporting | AgentState::AwaitingClose => {
                return ExportResponse::failed("An export is already in progress");
            }
            AgentState::DialogMounted => {
                // Re-target the open dialog; the root stays.
                if let Some(session) = self.session.as_mut() {
                    session.request = request;
                    session.view = view_for(&request);
                    session.redraw();
                    return ExportResponse::dialog_opened(&request);
                }
            }
            AgentState::Idle => {}
        }

        match self.mount(request) {
            Ok(()) => ExportResponse::dialog_opened(&request),
            Err(e) => {
                error!("Failed to mount export dialog: {}", e);
                ExportResponse::failed(e.to_string())
            }
        }
    }

    fn mount(&mut self, request: ExportRequest) -> Result<()> {
        let mut root = self.host.create_root()?;
        let view = view_for(&request);
        root.render(&view);
        self.session = Some(DialogSession {
            request,
            view,
            root,
        });
        self.state = AgentState::DialogMounted;
        Ok(())
    }

    fn unmount(&mut self) {
        if let Some(session) = self.session.take() {
            session.root.unmount();
        }
        self.state = AgentState::Idle;
    }

    /// User pressed Cancel. Ignored while controls are disabled.
    pub fn cancel(&mut self) -> bool {
        self.close()
    }

    /// User closed the dialog. Ignored while controls are disabled.
    pub fn close(&mut self) -> bool {
        match self.state {
            AgentState::Exporting => {
                warn!("Close ignored while exporting");
                false
            }
            AgentState::Idle => false,
            AgentState::DialogMounted | AgentState::AwaitingClose => {
                self.unmount();
                true
            }
        }
    }

    /// User confirmed: disable the controls and hand back the work to run.
    pub fn begin_export(&mut self) -> Result<ExportJob> {
        match self.state {
            AgentState::DialogMounted => {}
            AgentState::Exporting | AgentState::AwaitingClose => {
                return Err(Error::Validation("An export is already in progress".into()))
            }
            AgentState::Idle => {
                return Err(Error::Validation("No export dialog is open".into()))
            }
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::Internal("dialog mounted without a session".into()))?;

        session.view.error = None;
        session.view.set_busy(true);
        session.redraw();
        self.state = AgentState::Exporting;

        Ok(ExportJob {
            request: session.request,
            source: self.source.clone(),
            sink: self.sink.clone(),
        })
    }

    /// Apply the outcome of an [`ExportJob`]. Success tears the dialog
    /// down; failure re-enables the controls and shows the error.
    pub fn finish_export(&mut self, outcome: Result<SavedExport>) -> Result<SavedExport> {
        if self.state != AgentState::Exporting {
            return Err(Error::Internal("no export in progress".into()));
        }
        let format = self.session.as_ref().map(|s| s.request.format);

        match outcome {
            Ok(saved) => {
                self.state = AgentState::AwaitingClose;
                if let Some(format) = format {
                    self.toaster.toast(Toast::Success(format!(
                        "{} export completed successfully!",
                        format.tag()
                    )));
                }
                info!("Export saved to {}", saved.location);
                self.close();
                Ok(saved)
            }
            Err(e) => {
                error!("Export failed: {}", e);
                if let Some(session) = self.session.as_mut() {
                    session.view.set_busy(false);
                    session.view.error = Some(e.to_string());
                    session.redraw();
                }
                self.state = AgentState::DialogMounted;
                self.toaster.toast(Toast::Error(format!("Export failed: {}", e)));
                Err(e)
            }
        }
    }

    /// Confirm and run the export in one step.
    pub async fn perform_export(&mut self) -> Result<SavedExport> {
        let job = self.begin_export()?;
        let outcome = job.run().await;
        self.finish_export(outcome)
    }
}

impl Drop for PageAgent {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// The conversion work of one confirmed export, detached from the agent so
/// the agent is not borrowed while it runs.
pub struct ExportJob {
    request: ExportRequest,
    source: Arc<dyn ConversationSource>,
    sink: Arc<dyn DownloadSink>,
}

impl ExportJob {
    pub async fn run(self) -> Result<SavedExport> {
        let conversation = self.source.read_conversation().await?;
        let format = self.request.format;
        let bytes = render(&conversation, &self.request.include_messages, format)?;
        let filename = suggested_filename(&conversation, format);
        let location = self.sink.save(&filename, format.mime_type(), &bytes)?;
        Ok(SavedExport {
            filename,
            location,
            bytes: bytes.len(),
        })
    }
}

fn view_for(request: &ExportRequest) -> DialogView {
    let mut includes = Vec::new();
    if request.include_messages.user {
        includes.push("User messages");
    }
    if request.include_messages.assistant {
        includes.push("Assistant responses");
    }
    includes.push("Conversation metadata");
    DialogView::new(request.format, includes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::HeadlessHost;
    use crate::page::StaticSource;
    use gptexport_encode::{Conversation, Message, Role};
    use gptexport_protocol::{ExportFormat, ExportStatus, IncludeMessages, ToastLog};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    impl DownloadSink for MemorySink {
        fn save(&self, filename: &str, _mime_type: &str, bytes: &[u8]) -> Result<String> {
            if self.fail {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "downloads blocked",
                )));
            }
            self.saved.lock().push((filename.to_string(), bytes.to_vec()));
            Ok(format!("memory://{}", filename))
        }
    }

    fn conversation() -> Conversation {
        Conversation {
            id: "c1".into(),
            title: "Lifetimes".into(),
            url: None,
            created_at: None,
            messages: vec![
                Message {
                    role: Role::User,
                    content: "Explain 'a".into(),
                    created_at: None,
                },
                Message {
                    role: Role::Assistant,
                    content: "A lifetime parameter.".into(),
                    created_at: None,
                },
            ],
        }
    }

    struct Fixture {
        agent: PageAgent,
        host: HeadlessHost,
        sink: Arc<MemorySink>,
        toasts: Arc<ToastLog>,
    }

    fn fixture_with(source: StaticSource, sink: MemorySink) -> Fixture {
        let host = HeadlessHost::new();
        let sink = Arc::new(sink);
        let toasts = Arc::new(ToastLog::new());
        let agent = PageAgent::new(
            Arc::new(host.clone()),
            Arc::new(source),
            sink.clone(),
            toasts.clone(),
        );
        Fixture {
            agent,
            host,
            sink,
            toasts,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(StaticSource::new(conversation()), MemorySink::default())
    }

    fn request(format: ExportFormat) -> ExportRequest {
        ExportRequest::new(format, IncludeMessages::all())
    }

    #[test]
    fn test_request_mounts_and_acknowledges() {
        let mut f = fixture();
        let response = f.agent.on_export_request(request(ExportFormat::Pdf));
        assert_eq!(response.status, ExportStatus::Success);
        assert_eq!(response.format, Some(ExportFormat::Pdf));
        assert_eq!(response.include_messages, Some(IncludeMessages::all()));
        assert_eq!(response.message.as_deref(), Some("PDF export dialog opened"));
        assert_eq!(f.agent.state(), AgentState::DialogMounted);
        assert_eq!(f.host.live_roots(), 1);
        assert_eq!(f.host.current_view().unwrap().title, "Export as PDF");
    }

    #[test]
    fn test_second_request_retargets_same_root() {
        let mut f = fixture();
        f.agent.on_export_request(request(ExportFormat::Pdf));
        f.agent.on_export_request(request(ExportFormat::Html));
        assert_eq!(f.host.live_roots(), 1);
        assert_eq!(f.host.created_roots(), 1);
        assert_eq!(f.agent.view().unwrap().format, ExportFormat::Html);
        assert_eq!(f.host.current_view().unwrap().title, "Export as HTML");
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut f = fixture();
        f.agent.on_export_request(request(ExportFormat::Text));
        assert!(f.agent.cancel());
        assert_eq!(f.agent.state(), AgentState::Idle);
        assert_eq!(f.host.live_roots(), 0);
        assert!(!f.agent.close());
    }

    #[tokio::test]
    async fn test_mount_cycles_never_leak_roots() {
        let mut f = fixture();
        f.agent.on_export_request(request(ExportFormat::Markdown));
        f.agent.perform_export().await.unwrap();
        assert_eq!(f.host.live_roots(), 0);

        f.agent.on_export_request(request(ExportFormat::Json));
        assert_eq!(f.host.live_roots(), 1);
        f.agent.cancel();
        assert_eq!(f.host.live_roots(), 0);
        assert_eq!(f.host.created_roots(), 2);
    }

    #[tokio::test]
    async fn test_perform_export_saves_and_tears_down() {
        let mut f = fixture();
        f.agent.on_export_request(request(ExportFormat::Markdown));
        let saved = f.agent.perform_export().await.unwrap();
        assert_eq!(saved.filename, "Lifetimes.md");
        assert_eq!(f.agent.state(), AgentState::Idle);

        let stored = f.sink.saved.lock();
        assert_eq!(stored.len(), 1);
        assert!(String::from_utf8_lossy(&stored[0].1).contains("### Assistant"));
        assert_eq!(
            f.toasts.toasts(),
            vec![Toast::Success("MARKDOWN export completed successfully!".into())]
        );
    }

    #[test]
    fn test_exporting_disables_controls_and_rejects_requests() {
        let mut f = fixture();
        f.agent.on_export_request(request(ExportFormat::Pdf));
        let _job = f.agent.begin_export().unwrap();
        assert_eq!(f.agent.state(), AgentState::Exporting);

        let view = f.host.current_view().unwrap();
        assert!(view.busy);
        assert_eq!(view.export_label, "Exporting...");

        let response = f.agent.on_export_request(request(ExportFormat::Html));
        assert_eq!(response.status, ExportStatus::Error);
        assert!(!f.agent.close());
        assert!(f.agent.begin_export().is_err());
        assert_eq!(f.host.live_roots(), 1);
    }

    #[tokio::test]
    async fn test_failure_reenables_controls() {
        let mut f = fixture_with(
            StaticSource::new(conversation()),
            MemorySink {
                fail: true,
                ..Default::default()
            },
        );
        f.agent.on_export_request(request(ExportFormat::Html));
        let err = f.agent.perform_export().await.unwrap_err();
        assert!(err.to_string().contains("downloads blocked"));

        assert_eq!(f.agent.state(), AgentState::DialogMounted);
        let view = f.host.current_view().unwrap();
        assert!(!view.busy);
        assert_eq!(view.export_label, "Export HTML");
        assert!(view.error.unwrap().contains("downloads blocked"));
        assert!(matches!(f.toasts.toasts().last(), Some(Toast::Error(_))));

        // retry is possible from the re-enabled dialog
        assert!(f.agent.begin_export().is_ok());
    }

    #[tokio::test]
    async fn test_unreadable_page_surfaces_error() {
        let mut f = fixture_with(
            StaticSource::unreadable("not a conversation page"),
            MemorySink::default(),
        );
        f.agent.on_export_request(request(ExportFormat::Json));
        assert!(f.agent.perform_export().await.is_err());
        assert_eq!(f.agent.state(), AgentState::DialogMounted);
    }

    #[tokio::test]
    async fn test_filtered_to_nothing_is_an_error() {
        let mut conv = conversation();
        conv.messages.retain(|m| m.role == Role::Assistant);
        let mut f = fixture_with(StaticSource::new(conv), MemorySink::default());
        f.agent.on_export_request(ExportRequest::new(
            ExportFormat::Text,
            IncludeMessages {
                user: true,
                assistant: false,
            },
        ));
        let err = f.agent.perform_export().await.unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
    }

    #[test]
    fn test_invalid_selection_is_not_mounted() {
        let mut f = fixture();
        let response = f.agent.on_export_request(ExportRequest::new(
            ExportFormat::Pdf,
            IncludeMessages {
                user: false,
                assistant: false,
            },
        ));
        assert_eq!(response.status, ExportStatus::Error);
        assert_eq!(f.host.live_roots(), 0);
    }

    #[test]
    fn test_popup_channel_is_rejected() {
        let mut f = fixture();
        let reply = f.agent.handle(Request::PopupExport(request(ExportFormat::Pdf)));
        let response = reply.into_export().unwrap();
        assert_eq!(response.status, ExportStatus::Error);
    }

    #[test]
    fn test_begin_without_dialog_fails() {
        let mut f = fixture();
        assert!(matches!(f.agent.begin_export(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_drop_disposes_root() {
        let f = fixture();
        let host = f.host.clone();
        let mut agent = f.agent;
        agent.on_export_request(request(ExportFormat::Pdf));
        assert_eq!(host.live_roots(), 1);
        drop(agent);
        assert_eq!(host.live_roots(), 0);
    }
}
