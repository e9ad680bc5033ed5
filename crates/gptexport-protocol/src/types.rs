//! Export payload types — matching the extension's JSON wire shapes.

use gptexport_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Html,
    Pdf,
    Json,
    Text,
    Markdown,
}

impl ExportFormat {
    /// Formats in the order the popup lists them.
    pub fn all() -> &'static [ExportFormat] {
        &[Self::Pdf, Self::Html, Self::Json, Self::Text, Self::Markdown]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Json => "json",
            Self::Text => "text",
            Self::Markdown => "markdown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "json" => Some(Self::Json),
            "text" | "txt" => Some(Self::Text),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Human label shown in the format picker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Html => "HTML Web Page",
            Self::Pdf => "PDF Document",
            Self::Json => "JSON Data",
            Self::Text => "Plain Text",
            Self::Markdown => "Markdown",
        }
    }

    /// Upper-case tag used in notifications and dialog titles.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Html => "HTML",
            Self::Pdf => "PDF",
            Self::Json => "JSON",
            Self::Text => "TEXT",
            Self::Markdown => "MARKDOWN",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Json => "json",
            Self::Text => "txt",
            Self::Markdown => "md",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Pdf => "application/pdf",
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which message authors end up in the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeMessages {
    pub user: bool,
    pub assistant: bool,
}

impl IncludeMessages {
    pub fn all() -> Self {
        Self {
            user: true,
            assistant: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.user || self.assistant
    }

    pub fn summary(&self) -> &'static str {
        match (self.user, self.assistant) {
            (true, true) => "All messages",
            (true, false) => "User messages only",
            (false, true) => "Assistant messages only",
            (false, false) => "No messages selected",
        }
    }
}

impl Default for IncludeMessages {
    fn default() -> Self {
        Self::all()
    }
}

/// Payload of both `export-conversation` and `popup-export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub include_messages: IncludeMessages,
}

impl ExportRequest {
    pub fn new(format: ExportFormat, include_messages: IncludeMessages) -> Self {
        Self {
            format,
            include_messages,
        }
    }

    /// A request must select at least one message kind before dispatch.
    pub fn validate(&self) -> Result<()> {
        if self.include_messages.is_valid() {
            Ok(())
        } else {
            Err(Error::Validation(
                "Please select at least one message type".into(),
            ))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Success,
    Error,
}

/// Content agent reply on `export-conversation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub status: ExportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ExportFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_messages: Option<IncludeMessages>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportResponse {
    /// Acknowledges that the export dialog opened for `request`.
    pub fn dialog_opened(request: &ExportRequest) -> Self {
        Self {
            status: ExportStatus::Success,
            format: Some(request.format),
            include_messages: Some(request.include_messages),
            message: Some(format!("{} export dialog opened", request.format.tag())),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ExportStatus::Error,
            format: None,
            include_messages: None,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExportStatus::Success
    }
}

/// Background reply on `popup-export`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupExportResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ExportResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PopupExportResponse {
    pub fn relayed(response: ExportResponse) -> Self {
        Self {
            success: true,
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }
}
