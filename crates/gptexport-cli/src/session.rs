//! One browser profile: storage, config, tabs, bus, background and popup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use gptexport_agent::{DirectorySink, HeadlessHost, JsonFileSource, PageAgent, SavedExport};
use gptexport_bus::{AgentHandle, BackgroundLink, LocalBus, MenuRegistry, NotificationLog, TabRegistry};
use gptexport_core::{DataPaths, ExporterConfig, JsonFileStorage};
use gptexport_dispatch::{DispatchSettings, Dispatcher};
use gptexport_popup::{AuthGate, PopupController};
use gptexport_protocol::{ExportFormat, Notification, PopupExportResponse, Tab, TabId, ToastLog};
use tracing::{info, warn};

use crate::command::Selection;

const CHATGPT_URL: &str = "https://chatgpt.com/";

pub struct Session {
    pub paths: DataPaths,
    pub config: ExporterConfig,
    pub storage: Arc<JsonFileStorage>,
    pub tabs: Arc<TabRegistry>,
    pub bus: Arc<LocalBus>,
    pub notifications: Arc<NotificationLog>,
    pub menus: Arc<MenuRegistry>,
    pub toasts: Arc<ToastLog>,
    dispatcher: Arc<Dispatcher>,
}

/// What a context-menu click produced.
#[derive(Debug)]
pub struct MenuOutcome {
    pub notification: Option<Notification>,
    pub saved: Option<SavedExport>,
}

impl Session {
    /// Open the profile under `data_dir` and install the background.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let paths = DataPaths::new(data_dir)
            .with_context(|| format!("Failed to prepare {}", data_dir.display()))?;
        let config = ExporterConfig::load(&paths.config_file);
        if !paths.config_file.exists() {
            // first run: leave the defaults on disk for editing
            if let Err(e) = config.save() {
                warn!("Failed to write {}: {}", paths.config_file.display(), e);
            }
        }
        let storage = Arc::new(
            JsonFileStorage::open(&paths.storage_file)
                .map_err(|e| anyhow::anyhow!("Failed to open storage: {}", e))?,
        );

        let tabs = Arc::new(TabRegistry::new());
        let bus = Arc::new(LocalBus::new());
        let notifications = Arc::new(NotificationLog::new());
        let menus = Arc::new(MenuRegistry::new());
        let dispatcher = Dispatcher::new(
            bus.clone(),
            tabs.clone(),
            notifications.clone(),
            menus.clone(),
            storage.clone(),
            DispatchSettings::from(&config),
        );
        dispatcher.on_install();

        info!("Data directory: {}", paths.root.display());
        Ok(Self {
            paths,
            config,
            storage,
            tabs,
            bus,
            notifications,
            menus,
            toasts: Arc::new(ToastLog::new()),
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Open a ChatGPT tab showing `conversation` and inject its agent.
    pub fn load_page(&self, conversation: &Path, out: Option<&Path>) -> Result<(Tab, AgentHandle)> {
        if !conversation.is_file() {
            bail!("Conversation file not found: {}", conversation.display());
        }
        let out_dir = self.output_dir(out)?;
        let tab = self.tabs.open(1, Some(CHATGPT_URL));
        let agent = PageAgent::new(
            Arc::new(HeadlessHost::new()),
            Arc::new(JsonFileSource::new(conversation)),
            Arc::new(DirectorySink::new(&out_dir)),
            self.toasts.clone(),
        );
        let handle = self.bus.register(tab.id, agent);
        Ok((tab, handle))
    }

    pub fn popup(&self) -> PopupController {
        PopupController::open(
            Arc::new(BackgroundLink::new(self.dispatcher.clone())),
            self.storage.clone(),
            self.toasts.clone(),
            self.default_format(),
            self.config.reply_timeout() * 2,
        )
    }

    pub fn auth(&self) -> AuthGate {
        let mut gate = AuthGate::new(self.storage.clone());
        gate.load();
        gate
    }

    fn default_format(&self) -> ExportFormat {
        ExportFormat::from_name(&self.config.default_format).unwrap_or_else(|| {
            warn!(
                "Unknown defaultFormat {:?} in {}, using pdf",
                self.config.default_format,
                self.config.config_path.display()
            );
            ExportFormat::Pdf
        })
    }

    /// Close a page's tab; its agent goes with it.
    pub fn close_page(&self, tab: TabId) {
        self.bus.unregister(tab);
        self.tabs.close(tab);
    }

    fn output_dir(&self, out: Option<&Path>) -> Result<PathBuf> {
        let dir = out.map(Path::to_path_buf).unwrap_or_else(|| self.paths.exports.clone());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }

    /// Export from the popup, then press Export in the dialog it opened.
    pub async fn export(
        &self,
        conversation: &Path,
        format: Option<ExportFormat>,
        selection: Selection,
        out: Option<&Path>,
    ) -> Result<SavedExport> {
        let (tab, handle) = self.load_page(conversation, out)?;
        let saved = self.export_page(&handle, format, selection).await;
        self.close_page(tab.id);
        saved
    }

    async fn export_page(
        &self,
        handle: &AgentHandle,
        format: Option<ExportFormat>,
        selection: Selection,
    ) -> Result<SavedExport> {
        let mut popup = self.popup();
        if let Some(format) = format {
            popup.export_form.set_format(format);
        }
        let include = selection.include_messages();
        popup.export_form.set_user(include.user);
        popup.export_form.set_assistant(include.assistant);

        ensure_dialog_opened(popup.export().await?)?;
        let saved = handle.confirm_export().await?;
        Ok(saved)
    }

    /// Click a context-menu entry on a page showing `conversation`. On
    /// success the dialog is confirmed too.
    pub async fn context_menu(
        &self,
        menu_item_id: &str,
        conversation: &Path,
        out: Option<&Path>,
    ) -> Result<MenuOutcome> {
        let (tab, handle) = self.load_page(conversation, out)?;
        let notification = self
            .dispatcher
            .on_context_menu_click(menu_item_id, Some(&tab))
            .await;

        let started = notification.as_ref().map_or(false, |n| !n.is_error());
        let saved = if started {
            Some(handle.confirm_export().await)
        } else {
            None
        };
        self.close_page(tab.id);
        Ok(MenuOutcome {
            notification,
            saved: saved.transpose()?,
        })
    }
}

/// The background must have delivered the request and the agent must have
/// opened its dialog.
fn ensure_dialog_opened(reply: PopupExportResponse) -> Result<()> {
    if !reply.success {
        bail!(
            "Export failed: {}",
            reply.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    match reply.response {
        Some(response) if response.is_success() => Ok(()),
        Some(response) => bail!(
            "Export failed: {}",
            response
                .error
                .unwrap_or_else(|| "content script reported an error".to_string())
        ),
        None => bail!("Export failed: no reply from the content script"),
    }
}
