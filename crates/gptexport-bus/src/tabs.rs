//! Tabs and windows as the background sees them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gptexport_core::{Error, Result};
use gptexport_protocol::{Tab, TabId, TabResolver};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Default)]
struct TabsInner {
    tabs: BTreeMap<TabId, Tab>,
    next_id: u32,
    focused_window: Option<u32>,
}

impl TabsInner {
    fn set_active(&mut self, id: TabId, window_id: u32) {
        for tab in self.tabs.values_mut().filter(|t| t.window_id == window_id) {
            tab.active = tab.id == id;
        }
        self.focused_window = Some(window_id);
    }
}

/// Every open tab, one active per window, one focused window.
#[derive(Default)]
pub struct TabRegistry {
    inner: RwLock<TabsInner>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tab in `window_id`; it becomes active and its window focused.
    pub fn open(&self, window_id: u32, url: Option<&str>) -> Tab {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = TabId(inner.next_id);
        inner.tabs.insert(
            id,
            Tab {
                id,
                window_id,
                active: false,
                url: url.map(str::to_string),
            },
        );
        inner.set_active(id, window_id);
        debug!("Opened tab {} in window {}", id, window_id);
        inner.tabs[&id].clone()
    }

    /// Make `id` the active tab of its window and focus that window.
    pub fn activate(&self, id: TabId) -> Result<()> {
        let mut inner = self.inner.write();
        let window_id = inner
            .tabs
            .get(&id)
            .map(|t| t.window_id)
            .ok_or_else(|| Error::Validation(format!("No tab with id: {}", id)))?;
        inner.set_active(id, window_id);
        Ok(())
    }

    pub fn focus_window(&self, window_id: u32) {
        self.inner.write().focused_window = Some(window_id);
    }

    /// Close a tab. If it was active, the last remaining tab of its window
    /// takes over.
    pub fn close(&self, id: TabId) -> Option<Tab> {
        let mut inner = self.inner.write();
        let closed = inner.tabs.remove(&id)?;
        if closed.active {
            let successor = inner
                .tabs
                .values()
                .filter(|t| t.window_id == closed.window_id)
                .map(|t| t.id)
                .last();
            if let Some(next) = successor {
                inner.set_active(next, closed.window_id);
            }
        }
        debug!("Closed tab {}", id);
        Some(closed)
    }

}

#[async_trait]
impl TabResolver for TabRegistry {
    async fn active_tab(&self) -> Result<Option<Tab>> {
        let inner = self.inner.read();
        let Some(window_id) = inner.focused_window else {
            return Ok(None);
        };
        Ok(inner
            .tabs
            .values()
            .find(|t| t.window_id == window_id && t.active)
            .cloned())
    }
}
