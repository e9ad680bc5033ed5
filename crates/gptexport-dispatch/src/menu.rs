//! Context menu entries.

use gptexport_protocol::{ExportFormat, MenuItem};

pub const MENU_EXPORT_HTML: &str = "export-chatgpt-conversation-html";
pub const MENU_EXPORT_PDF: &str = "export-chatgpt-conversation-pdf";

/// Entries registered on install, visible in all contexts.
pub fn menu_items() -> Vec<MenuItem> {
    [
        (MENU_EXPORT_HTML, ExportFormat::Html),
        (MENU_EXPORT_PDF, ExportFormat::Pdf),
    ]
    .into_iter()
    .map(|(id, format)| MenuItem {
        id: id.to_string(),
        title: format!("Export This Conversation as {}", format.tag()),
        contexts: vec!["all".to_string()],
    })
    .collect()
}

pub fn format_for_menu(menu_item_id: &str) -> Option<ExportFormat> {
    match menu_item_id {
        MENU_EXPORT_HTML => Some(ExportFormat::Html),
        MENU_EXPORT_PDF => Some(ExportFormat::Pdf),
        _ => None,
    }
}
