//! Browser surfaces each context talks to: the message bus, tabs,
//! notifications, the context menu, and in-page toasts.

use async_trait::async_trait;
use gptexport_core::Result;
use serde::{Deserialize, Serialize};

use crate::channel::{Endpoint, Reply, Request, TabId};

/// One-shot request/reply delivery to another context.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Deliver `request` to `to` and wait for its single reply.
    async fn send(&self, to: Endpoint, request: Request) -> Result<Reply>;
}

/// A browser tab as seen by the background context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: u32,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Resolves the tab that is active in the current window, at call time.
#[async_trait]
pub trait TabResolver: Send + Sync {
    async fn active_tab(&self) -> Result<Option<Tab>>;
}

/// OS-level notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    pub icon_url: String,
    pub title: String,
    pub message: String,
}

pub const NOTIFY_TITLE: &str = "ChatGPT Exporter";
pub const NOTIFY_ERROR_TITLE: &str = "ChatGPT Exporter Error";

/// Local storage key holding the popup's most recent export request.
pub const LAST_EXPORT_KEY: &str = "lastExport";

impl Notification {
    pub fn basic(icon_url: &str, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind: "basic".into(),
            icon_url: icon_url.into(),
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.title == NOTIFY_ERROR_TITLE
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<()>;
}

/// Context menu entry registered on install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub contexts: Vec<String>,
}

pub trait ContextMenus: Send + Sync {
    fn create(&self, item: MenuItem) -> Result<()>;
}

/// Transient in-page message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Success(String),
    Error(String),
}

pub trait Toaster: Send + Sync {
    fn toast(&self, toast: Toast);
}

/// Records toasts in order and mirrors them to the log.
#[derive(Default)]
pub struct ToastLog {
    toasts: parking_lot::Mutex<Vec<Toast>>,
}

impl ToastLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }
}

impl Toaster for ToastLog {
    fn toast(&self, toast: Toast) {
        match &toast {
            Toast::Success(msg) => tracing::info!("toast: {}", msg),
            Toast::Error(msg) => tracing::warn!("toast: {}", msg),
        }
        self.toasts.lock().push(toast);
    }
}
