//! Background dispatcher.
//!
//! Every failure is turned into a response object or a notification here;
//! nothing escapes to the caller as an error.

use std::sync::Arc;
use std::time::Duration;

use gptexport_core::{Error, ExporterConfig, LocalStorage, Result};
use gptexport_protocol::{
    ContextMenus, Endpoint, ExportRequest, ExportResponse, IncludeMessages, MessageBus,
    Notification, Notifier, PopupExportResponse, Reply, Request, Tab, TabId, TabResolver,
    LAST_EXPORT_KEY, NOTIFY_ERROR_TITLE, NOTIFY_TITLE,
};
use tracing::{debug, error, info, warn};

use crate::menu::{format_for_menu, menu_items};

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub reply_timeout: Duration,
    pub notification_icon: String,
    /// Context-menu exports include every message kind; when off they reuse
    /// the popup's last selection.
    pub context_menu_full_export: bool,
}

impl From<&ExporterConfig> for DispatchSettings {
    fn from(config: &ExporterConfig) -> Self {
        Self {
            reply_timeout: config.reply_timeout(),
            notification_icon: config.notification_icon.clone(),
            context_menu_full_export: config.context_menu_full_export,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&ExporterConfig::default())
    }
}

pub struct Dispatcher {
    bus: Arc<dyn MessageBus>,
    tabs: Arc<dyn TabResolver>,
    notifier: Arc<dyn Notifier>,
    menus: Arc<dyn ContextMenus>,
    storage: Arc<dyn LocalStorage>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        tabs: Arc<dyn TabResolver>,
        notifier: Arc<dyn Notifier>,
        menus: Arc<dyn ContextMenus>,
        storage: Arc<dyn LocalStorage>,
        settings: DispatchSettings,
    ) -> Self {
        info!("Background dispatcher initialized");
        Self {
            bus,
            tabs,
            notifier,
            menus,
            storage,
            settings,
        }
    }

    /// Register the context-menu entries.
    pub fn on_install(&self) {
        for item in menu_items() {
            let id = item.id.clone();
            if let Err(e) = self.menus.create(item) {
                warn!("Failed to create context menu {}: {}", id, e);
            }
        }
        info!("Context menus created");
    }

    /// Entry point for every channel addressed to the background.
    pub async fn handle(&self, request: Request) -> Reply {
        match request {
            Request::PopupExport(req) => Reply::PopupExport(self.on_popup_export(req).await),
            Request::ExportConversation(_) => {
                warn!("export-conversation delivered to the background");
                Reply::Export(ExportResponse::failed(
                    "export-conversation must be sent to a content script",
                ))
            }
        }
    }

    /// Handle a context-menu click. Returns the notification raised, if any.
    pub async fn on_context_menu_click(
        &self,
        menu_item_id: &str,
        tab: Option<&Tab>,
    ) -> Option<Notification> {
        info!(
            "Context menu clicked: {} on tab: {:?}",
            menu_item_id,
            tab.map(|t| t.id)
        );
        let Some(tab) = tab else {
            debug!("Context menu click without a tab");
            return None;
        };
        let Some(format) = format_for_menu(menu_item_id) else {
            debug!("Ignoring unknown menu item {}", menu_item_id);
            return None;
        };

        let request = ExportRequest::new(format, self.context_menu_selection());
        let notification = match self.send_to_agent(tab.id, request).await {
            Ok(response) if response.is_success() => {
                info!("Response from content script: {:?}", response);
                Notification::basic(
                    &self.settings.notification_icon,
                    NOTIFY_TITLE,
                    format!("{} export started!", format.tag()),
                )
            }
            Ok(response) => {
                let reason = response
                    .error
                    .unwrap_or_else(|| "content script reported an error".to_string());
                self.failure_notification(&reason)
            }
            Err(e) => {
                error!("Failed to send export message: {}", e);
                self.failure_notification(&e.to_string())
            }
        };

        if let Err(e) = self.notifier.notify(notification.clone()) {
            warn!("Failed to show notification: {}", e);
        }
        Some(notification)
    }

    /// Forward a popup export to the active tab's agent and relay its reply.
    pub async fn on_popup_export(&self, request: ExportRequest) -> PopupExportResponse {
        info!("Export request from popup: {:?}", request);
        match self.forward_popup_export(request).await {
            Ok(response) => {
                info!("Export completed: {:?}", response);
                PopupExportResponse::relayed(response)
            }
            Err(e) => {
                error!("Export failed: {}", e);
                PopupExportResponse::failed(e.to_string())
            }
        }
    }

    async fn forward_popup_export(&self, request: ExportRequest) -> Result<ExportResponse> {
        request.validate()?;
        let tab = self.tabs.active_tab().await?.ok_or(Error::NoActiveTab)?;
        self.send_to_agent(tab.id, request).await
    }

    /// One bounded send to a tab's content agent. Never retried.
    async fn send_to_agent(&self, tab: TabId, request: ExportRequest) -> Result<ExportResponse> {
        let endpoint = Endpoint::ContentScript(tab);
        let send = self.bus.send(endpoint, Request::ExportConversation(request));
        match tokio::time::timeout(self.settings.reply_timeout, send).await {
            Ok(reply) => reply?.into_export(),
            Err(_) => Err(Error::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms: self.settings.reply_timeout.as_millis() as u64,
            }),
        }
    }

    fn context_menu_selection(&self) -> IncludeMessages {
        if self.settings.context_menu_full_export {
            return IncludeMessages::all();
        }
        let last = self
            .storage
            .get(LAST_EXPORT_KEY)
            .ok()
            .flatten()
            .and_then(|v| serde_json::from_value::<ExportRequest>(v).ok());
        match last {
            Some(req) if req.include_messages.is_valid() => req.include_messages,
            _ => IncludeMessages::all(),
        }
    }

    fn failure_notification(&self, reason: &str) -> Notification {
        Notification::basic(
            &self.settings.notification_icon,
            NOTIFY_ERROR_TITLE,
            format!("Export failed: {}", reason),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gptexport_core::MemoryStorage;
    use gptexport_protocol::{ExportFormat, ExportStatus, MenuItem};
    use parking_lot::Mutex;

    /// Agent double: records every delivery and answers from a script.
    #[derive(Default)]
    struct FakeBus {
        sent: Mutex<Vec<(Endpoint, Request)>>,
        mode: Mode,
    }

    #[derive(Default)]
    enum Mode {
        #[default]
        Acknowledge,
        Unreachable,
        Hang,
        ReplyError,
    }

    #[async_trait]
    impl MessageBus for FakeBus {
        async fn send(&self, to: Endpoint, request: Request) -> Result<Reply> {
            self.sent.lock().push((to, request.clone()));
            match self.mode {
                Mode::Acknowledge => match request {
                    Request::ExportConversation(req) => {
                        Ok(Reply::Export(ExportResponse::dialog_opened(&req)))
                    }
                    Request::PopupExport(_) => Err(Error::Internal("wrong channel".into())),
                },
                Mode::Unreachable => Err(Error::AgentUnreachable(to.to_string())),
                Mode::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Mode::ReplyError => Ok(Reply::Export(ExportResponse::failed("page not ready"))),
            }
        }
    }

    struct FixedTab(Option<Tab>);

    #[async_trait]
    impl TabResolver for FixedTab {
        async fn active_tab(&self) -> Result<Option<Tab>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Recorder {
        notifications: Mutex<Vec<Notification>>,
        menus: Mutex<Vec<MenuItem>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) -> Result<()> {
            self.notifications.lock().push(notification);
            Ok(())
        }
    }

    impl ContextMenus for Recorder {
        fn create(&self, item: MenuItem) -> Result<()> {
            self.menus.lock().push(item);
            Ok(())
        }
    }

    fn tab(id: u32) -> Tab {
        Tab {
            id: TabId(id),
            window_id: 1,
            active: true,
            url: Some("https://chatgpt.com/c/abc".into()),
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        bus: Arc<FakeBus>,
        recorder: Arc<Recorder>,
        storage: Arc<MemoryStorage>,
    }

    fn fixture(mode: Mode, active: Option<Tab>, settings: DispatchSettings) -> Fixture {
        let bus = Arc::new(FakeBus {
            mode,
            ..Default::default()
        });
        let recorder = Arc::new(Recorder::default());
        let storage = Arc::new(MemoryStorage::new());
        let dispatcher = Dispatcher::new(
            bus.clone(),
            Arc::new(FixedTab(active)),
            recorder.clone(),
            recorder.clone(),
            storage.clone(),
            settings,
        );
        Fixture {
            dispatcher,
            bus,
            recorder,
            storage,
        }
    }

    fn request(format: ExportFormat, user: bool, assistant: bool) -> ExportRequest {
        ExportRequest::new(format, IncludeMessages { user, assistant })
    }

    #[test]
    fn test_on_install_registers_two_entries() {
        let f = fixture(Mode::Acknowledge, None, DispatchSettings::default());
        f.dispatcher.on_install();
        let menus = f.recorder.menus.lock();
        let ids: Vec<&str> = menus.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["export-chatgpt-conversation-html", "export-chatgpt-conversation-pdf"]
        );
    }

    #[tokio::test]
    async fn test_popup_export_relays_agent_reply() {
        let f = fixture(Mode::Acknowledge, Some(tab(7)), DispatchSettings::default());
        let req = request(ExportFormat::Json, true, false);
        let reply = f.dispatcher.on_popup_export(req).await;

        assert!(reply.success);
        let response = reply.response.unwrap();
        assert_eq!(response.status, ExportStatus::Success);
        assert_eq!(response.format, Some(ExportFormat::Json));
        assert_eq!(response.include_messages, Some(req.include_messages));

        let sent = f.bus.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Endpoint::ContentScript(TabId(7)));
    }

    #[tokio::test]
    async fn test_popup_export_without_active_tab() {
        let f = fixture(Mode::Acknowledge, None, DispatchSettings::default());
        let reply = f.dispatcher.on_popup_export(request(ExportFormat::Pdf, true, true)).await;
        assert_eq!(reply, PopupExportResponse::failed("No active tab found"));
        assert!(f.bus.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_popup_export_unreachable_agent() {
        let f = fixture(Mode::Unreachable, Some(tab(3)), DispatchSettings::default());
        let reply = f.dispatcher.on_popup_export(request(ExportFormat::Pdf, true, true)).await;
        assert!(!reply.success);
        assert!(reply.error.unwrap().contains("content-script@3"));
    }

    #[tokio::test]
    async fn test_popup_export_rejects_empty_selection() {
        let f = fixture(Mode::Acknowledge, Some(tab(3)), DispatchSettings::default());
        let reply = f.dispatcher.on_popup_export(request(ExportFormat::Pdf, false, false)).await;
        assert!(!reply.success);
        assert!(f.bus.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_handle_routes_by_variant() {
        let f = fixture(Mode::Acknowledge, Some(tab(2)), DispatchSettings::default());
        let reply = f
            .dispatcher
            .handle(Request::PopupExport(request(ExportFormat::Text, true, true)))
            .await;
        assert!(reply.into_popup_export().unwrap().success);

        let misrouted = f
            .dispatcher
            .handle(Request::ExportConversation(request(ExportFormat::Text, true, true)))
            .await;
        assert_eq!(misrouted.into_export().unwrap().status, ExportStatus::Error);
    }

    #[tokio::test]
    async fn test_context_menu_pdf_sends_once_and_notifies_once() {
        let f = fixture(Mode::Acknowledge, None, DispatchSettings::default());
        let t = tab(11);
        let notification = f
            .dispatcher
            .on_context_menu_click("export-chatgpt-conversation-pdf", Some(&t))
            .await
            .unwrap();

        let sent = f.bus.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            (
                Endpoint::ContentScript(TabId(11)),
                Request::ExportConversation(request(ExportFormat::Pdf, true, true))
            )
        );

        let shown = f.recorder.notifications.lock();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0], notification);
        assert_eq!(notification.title, "ChatGPT Exporter");
        assert_eq!(notification.message, "PDF export started!");
        assert_eq!(notification.icon_url, "icon/48.png");
    }

    #[tokio::test]
    async fn test_context_menu_without_tab_is_noop() {
        let f = fixture(Mode::Acknowledge, None, DispatchSettings::default());
        assert!(f
            .dispatcher
            .on_context_menu_click("export-chatgpt-conversation-html", None)
            .await
            .is_none());
        assert!(f.bus.sent.lock().is_empty());
        assert!(f.recorder.notifications.lock().is_empty());
    }

    #[tokio::test]
    async fn test_context_menu_unknown_item_is_noop() {
        let f = fixture(Mode::Acknowledge, None, DispatchSettings::default());
        let t = tab(1);
        assert!(f.dispatcher.on_context_menu_click("other", Some(&t)).await.is_none());
        assert!(f.bus.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_context_menu_failure_notifies_error_without_retry() {
        let f = fixture(Mode::Unreachable, None, DispatchSettings::default());
        let t = tab(5);
        let notification = f
            .dispatcher
            .on_context_menu_click("export-chatgpt-conversation-html", Some(&t))
            .await
            .unwrap();
        assert!(notification.is_error());
        assert_eq!(notification.title, "ChatGPT Exporter Error");
        assert!(notification.message.starts_with("Export failed: "));
        assert_eq!(f.bus.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_context_menu_error_status_notifies_error() {
        let f = fixture(Mode::ReplyError, None, DispatchSettings::default());
        let t = tab(5);
        let notification = f
            .dispatcher
            .on_context_menu_click("export-chatgpt-conversation-pdf", Some(&t))
            .await
            .unwrap();
        assert_eq!(notification.message, "Export failed: page not ready");
    }

    #[tokio::test]
    async fn test_silent_agent_times_out() {
        let settings = DispatchSettings {
            reply_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let f = fixture(Mode::Hang, Some(tab(9)), settings);
        let reply = f.dispatcher.on_popup_export(request(ExportFormat::Pdf, true, true)).await;
        assert!(!reply.success);
        assert_eq!(
            reply.error.as_deref(),
            Some("No reply from content-script@9 within 50ms")
        );

        let t = tab(9);
        let notification = f
            .dispatcher
            .on_context_menu_click("export-chatgpt-conversation-pdf", Some(&t))
            .await
            .unwrap();
        assert!(notification.is_error());
    }

    #[tokio::test]
    async fn test_context_menu_can_reuse_last_selection() {
        let settings = DispatchSettings {
            context_menu_full_export: false,
            ..Default::default()
        };
        let f = fixture(Mode::Acknowledge, None, settings);
        f.storage
            .set(
                LAST_EXPORT_KEY,
                serde_json::to_value(request(ExportFormat::Markdown, false, true)).unwrap(),
            )
            .unwrap();
        let t = tab(4);
        f.dispatcher
            .on_context_menu_click("export-chatgpt-conversation-html", Some(&t))
            .await;
        let sent = f.bus.sent.lock();
        assert_eq!(
            sent[0].1,
            Request::ExportConversation(request(ExportFormat::Html, false, true))
        );
    }
}
