//! Notification and context-menu surfaces that record what they are given.

use gptexport_core::{Error, Result};
use gptexport_protocol::{ContextMenus, MenuItem, Notification, Notifier};
use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Default)]
pub struct NotificationLog {
    shown: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.shown.lock().clone()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) -> Result<()> {
        if notification.is_error() {
            warn!("{}: {}", notification.title, notification.message);
        } else {
            info!("{}: {}", notification.title, notification.message);
        }
        self.shown.lock().push(notification);
        Ok(())
    }
}

#[derive(Default)]
pub struct MenuRegistry {
    items: Mutex<Vec<MenuItem>>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<MenuItem> {
        self.items.lock().clone()
    }
}

impl ContextMenus for MenuRegistry {
    /// Ids are unique; registering one twice fails.
    fn create(&self, item: MenuItem) -> Result<()> {
        let mut items = self.items.lock();
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(Error::Validation(format!(
                "Cannot create item with duplicate id {}",
                item.id
            )));
        }
        items.push(item);
        Ok(())
    }
}
