//! Export dialog view model and the rendering roots it is drawn into.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gptexport_core::Result;
use gptexport_protocol::ExportFormat;
use parking_lot::Mutex;
use tracing::debug;

/// Everything the overlay dialog shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogView {
    pub format: ExportFormat,
    pub title: String,
    pub description: String,
    pub includes: Vec<&'static str>,
    /// Export, Cancel and Close are all disabled while busy.
    pub busy: bool,
    pub export_label: String,
    pub error: Option<String>,
}

impl DialogView {
    pub fn new(format: ExportFormat, includes: Vec<&'static str>) -> Self {
        Self {
            format,
            title: format!("Export as {}", format.tag()),
            description: format!(
                "Your conversation will be exported as a {} file.",
                format.tag()
            ),
            includes,
            busy: false,
            export_label: format!("Export {}", format.tag()),
            error: None,
        }
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        self.export_label = if busy {
            "Exporting...".to_string()
        } else {
            format!("Export {}", self.format.tag())
        };
    }
}

/// A live rendering root. Created once per mount cycle and consumed by
/// `unmount`, so it cannot be disposed twice.
pub trait RenderRoot: Send {
    fn render(&mut self, view: &DialogView);

    fn unmount(self: Box<Self>);
}

/// The page overlay that hands out rendering roots.
pub trait DialogHost: Send + Sync {
    fn create_root(&self) -> Result<Box<dyn RenderRoot>>;
}

/// Host without a DOM: tracks live roots and keeps the last rendered view.
#[derive(Default, Clone)]
pub struct HeadlessHost {
    live: Arc<AtomicUsize>,
    created: Arc<AtomicUsize>,
    last_view: Arc<Mutex<Option<DialogView>>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roots currently mounted.
    pub fn live_roots(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Roots created over the host's lifetime.
    pub fn created_roots(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Last view drawn into a root still mounted.
    pub fn current_view(&self) -> Option<DialogView> {
        self.last_view.lock().clone()
    }
}

impl DialogHost for HeadlessHost {
    fn create_root(&self) -> Result<Box<dyn RenderRoot>> {
        self.live.fetch_add(1, Ordering::SeqCst);
        let id = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Created dialog root #{}", id);
        Ok(Box::new(HeadlessRoot {
            id,
            live: self.live.clone(),
            last_view: self.last_view.clone(),
        }))
    }
}

struct HeadlessRoot {
    id: usize,
    live: Arc<AtomicUsize>,
    last_view: Arc<Mutex<Option<DialogView>>>,
}

impl RenderRoot for HeadlessRoot {
    fn render(&mut self, view: &DialogView) {
        *self.last_view.lock() = Some(view.clone());
    }

    fn unmount(self: Box<Self>) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        *self.last_view.lock() = None;
        debug!("Disposed dialog root #{}", self.id);
    }
}
