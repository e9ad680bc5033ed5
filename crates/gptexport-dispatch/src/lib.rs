//! Background dispatcher — the single resolution point between UI events
//! (context-menu clicks, popup requests) and the content agent of the
//! active tab.

pub mod dispatcher;
pub mod menu;

pub use dispatcher::{DispatchSettings, Dispatcher};
pub use menu::{format_for_menu, menu_items, MENU_EXPORT_HTML, MENU_EXPORT_PDF};
