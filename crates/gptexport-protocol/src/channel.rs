//! Channel routing: addresses and the tagged request/reply variants.

use gptexport_core::Error;
use serde::{Deserialize, Serialize};

use crate::types::{ExportRequest, ExportResponse, PopupExportResponse};

/// Opaque browser tab handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addressable execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Background,
    ContentScript(TabId),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Background => write!(f, "background"),
            Self::ContentScript(tab) => write!(f, "content-script@{}", tab),
        }
    }
}

/// Every request a context can receive. Adding a channel means adding a
/// variant here, and every handler's `match` must then cover it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "data")]
pub enum Request {
    #[serde(rename = "export-conversation")]
    ExportConversation(ExportRequest),
    #[serde(rename = "popup-export")]
    PopupExport(ExportRequest),
}

impl Request {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::ExportConversation(_) => "export-conversation",
            Self::PopupExport(_) => "popup-export",
        }
    }
}

/// The single reply to a [`Request`], one variant per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "data")]
pub enum Reply {
    #[serde(rename = "export-conversation")]
    Export(ExportResponse),
    #[serde(rename = "popup-export")]
    PopupExport(PopupExportResponse),
}

impl Reply {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Export(_) => "export-conversation",
            Self::PopupExport(_) => "popup-export",
        }
    }

    /// Unwrap an `export-conversation` reply, rejecting a mismatched channel.
    pub fn into_export(self) -> gptexport_core::Result<ExportResponse> {
        match self {
            Self::Export(response) => Ok(response),
            other => Err(Error::Internal(format!(
                "expected export-conversation reply, got {}",
                other.channel()
            ))),
        }
    }

    /// Unwrap a `popup-export` reply, rejecting a mismatched channel.
    pub fn into_popup_export(self) -> gptexport_core::Result<PopupExportResponse> {
        match self {
            Self::PopupExport(response) => Ok(response),
            other => Err(Error::Internal(format!(
                "expected popup-export reply, got {}",
                other.channel()
            ))),
        }
    }
}
