//! Routes content-script traffic to per-tab page agents.
//!
//! Each registered agent runs behind its own tokio task with an `mpsc`
//! inbox; every delivery carries a `oneshot` for the single reply.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gptexport_agent::{AgentState, DialogView, PageAgent, SavedExport};
use gptexport_core::{Error, Result};
use gptexport_protocol::{Endpoint, MessageBus, Reply, Request, TabId};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const INBOX_CAPACITY: usize = 16;

struct Delivery {
    request: Request,
    reply: oneshot::Sender<Reply>,
}

/// Direct handle on a registered agent, standing in for the user's clicks
/// on the dialog.
#[derive(Clone)]
pub struct AgentHandle {
    tab: TabId,
    agent: Arc<Mutex<PageAgent>>,
}

impl AgentHandle {
    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn state(&self) -> AgentState {
        self.agent.lock().state()
    }

    pub fn view(&self) -> Option<DialogView> {
        self.agent.lock().view().cloned()
    }

    /// Press Export in the dialog. The agent stays reachable while the
    /// export runs.
    pub async fn confirm_export(&self) -> Result<SavedExport> {
        let job = self.agent.lock().begin_export()?;
        let outcome = job.run().await;
        self.agent.lock().finish_export(outcome)
    }

    pub fn cancel(&self) -> bool {
        self.agent.lock().cancel()
    }
}

#[derive(Default)]
pub struct LocalBus {
    inboxes: RwLock<HashMap<TabId, mpsc::Sender<Delivery>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `agent` as the content script of `tab`, replacing any agent
    /// already there. Must be called from within a tokio runtime.
    pub fn register(&self, tab: TabId, agent: PageAgent) -> AgentHandle {
        let agent = Arc::new(Mutex::new(agent));
        let (tx, mut rx) = mpsc::channel::<Delivery>(INBOX_CAPACITY);

        let served = agent.clone();
        tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                let reply = served.lock().handle(delivery.request);
                if delivery.reply.send(reply).is_err() {
                    debug!("Sender of a request to tab {} went away", tab);
                }
            }
            debug!("Content agent for tab {} stopped", tab);
        });

        if self.inboxes.write().insert(tab, tx).is_some() {
            info!("Replaced content agent for tab {}", tab);
        } else {
            info!("Registered content agent for tab {}", tab);
        }
        AgentHandle { tab, agent }
    }

    /// Detach the agent of `tab`. Its task ends once the inbox drains.
    pub fn unregister(&self, tab: TabId) -> bool {
        self.inboxes.write().remove(&tab).is_some()
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn send(&self, to: Endpoint, request: Request) -> Result<Reply> {
        let inbox = match to {
            Endpoint::ContentScript(tab) => self.inboxes.read().get(&tab).cloned(),
            Endpoint::Background => None,
        };
        let Some(inbox) = inbox else {
            warn!("No receiver for {} on {}", request.channel(), to);
            return Err(Error::AgentUnreachable(to.to_string()));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        inbox
            .send(Delivery {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::AgentUnreachable(to.to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::AgentUnreachable(to.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gptexport_agent::{HeadlessHost, StaticSource};
    use gptexport_encode::{Conversation, Message, Role};
    use gptexport_protocol::{ExportFormat, ExportRequest, IncludeMessages, ToastLog};

    struct NullSink;

    impl gptexport_agent::DownloadSink for NullSink {
        fn save(&self, filename: &str, _mime_type: &str, _bytes: &[u8]) -> Result<String> {
            Ok(format!("null://{}", filename))
        }
    }

    fn agent(host: &HeadlessHost) -> PageAgent {
        let conversation = Conversation {
            id: "c1".into(),
            title: "Traits".into(),
            url: None,
            created_at: None,
            messages: vec![Message {
                role: Role::User,
                content: "What is a vtable?".into(),
                created_at: None,
            }],
        };
        PageAgent::new(
            Arc::new(host.clone()),
            Arc::new(StaticSource::new(conversation)),
            Arc::new(NullSink),
            Arc::new(ToastLog::new()),
        )
    }

    fn export_request(format: ExportFormat) -> Request {
        Request::ExportConversation(ExportRequest::new(format, IncludeMessages::all()))
    }

    #[tokio::test]
    async fn test_delivers_to_registered_agent() {
        let bus = LocalBus::new();
        let host = HeadlessHost::new();
        let handle = bus.register(TabId(3), agent(&host));

        let reply = bus
            .send(Endpoint::ContentScript(TabId(3)), export_request(ExportFormat::Pdf))
            .await
            .unwrap()
            .into_export()
            .unwrap();
        assert!(reply.is_success());
        assert_eq!(handle.state(), AgentState::DialogMounted);
        assert_eq!(host.live_roots(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_tab_is_unreachable() {
        let bus = LocalBus::new();
        let err = bus
            .send(Endpoint::ContentScript(TabId(4)), export_request(ExportFormat::Html))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AgentUnreachable(ref e) if e == "content-script@4"));

        let err = bus
            .send(Endpoint::Background, export_request(ExportFormat::Html))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AgentUnreachable(_)));
    }

    #[tokio::test]
    async fn test_unregister_detaches_agent() {
        let bus = LocalBus::new();
        let host = HeadlessHost::new();
        bus.register(TabId(5), agent(&host));
        assert!(bus.unregister(TabId(5)));
        assert!(!bus.unregister(TabId(5)));
        assert!(bus
            .send(Endpoint::ContentScript(TabId(5)), export_request(ExportFormat::Pdf))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_agents_in_different_tabs_are_independent() {
        let bus = LocalBus::new();
        let (host_a, host_b) = (HeadlessHost::new(), HeadlessHost::new());
        let a = bus.register(TabId(1), agent(&host_a));
        let b = bus.register(TabId(2), agent(&host_b));

        bus.send(Endpoint::ContentScript(TabId(1)), export_request(ExportFormat::Json))
            .await
            .unwrap();
        assert_eq!(a.state(), AgentState::DialogMounted);
        assert_eq!(b.state(), AgentState::Idle);
        assert_eq!(host_b.created_roots(), 0);
    }

    #[tokio::test]
    async fn test_confirm_export_through_handle() {
        let bus = LocalBus::new();
        let host = HeadlessHost::new();
        let handle = bus.register(TabId(8), agent(&host));
        bus.send(Endpoint::ContentScript(TabId(8)), export_request(ExportFormat::Markdown))
            .await
            .unwrap();

        let saved = handle.confirm_export().await.unwrap();
        assert_eq!(saved.filename, "Traits.md");
        assert_eq!(saved.location, "null://Traits.md");
        assert_eq!(handle.state(), AgentState::Idle);
        assert_eq!(host.live_roots(), 0);
        // nothing left to confirm
        assert!(handle.confirm_export().await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_through_handle() {
        let bus = LocalBus::new();
        let host = HeadlessHost::new();
        let handle = bus.register(TabId(2), agent(&host));
        assert!(!handle.cancel());
        bus.send(Endpoint::ContentScript(TabId(2)), export_request(ExportFormat::Text))
            .await
            .unwrap();
        assert!(handle.cancel());
        assert_eq!(host.live_roots(), 0);
        assert_eq!(handle.tab(), TabId(2));
    }
}
