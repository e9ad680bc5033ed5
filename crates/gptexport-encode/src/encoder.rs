//! The common "render conversation to bytes" capability.

use gptexport_protocol::{ExportFormat, IncludeMessages};
use thiserror::Error;

use crate::conversation::Conversation;
use crate::html::HtmlEncoder;
use crate::json::JsonEncoder;
use crate::pdf::PdfEncoder;
use crate::text::{MarkdownEncoder, TextEncoder};

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Nothing to export: no messages match the selected message types")]
    EmptyConversation,

    #[error("Malformed conversation: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<EncodeError> for gptexport_core::Error {
    fn from(e: EncodeError) -> Self {
        gptexport_core::Error::Encode(e.to_string())
    }
}

/// Renders a conversation as one document format.
pub trait Encoder: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn encode(&self, conversation: &Conversation) -> Result<Vec<u8>, EncodeError>;
}

/// Select the encoder for a format.
pub fn encoder_for(format: ExportFormat) -> Box<dyn Encoder> {
    match format {
        ExportFormat::Html => Box::new(HtmlEncoder),
        ExportFormat::Pdf => Box::new(PdfEncoder::default()),
        ExportFormat::Json => Box::new(JsonEncoder),
        ExportFormat::Text => Box::new(TextEncoder),
        ExportFormat::Markdown => Box::new(MarkdownEncoder),
    }
}

/// Filter by message kind, then encode. An export with no remaining
/// messages is an error rather than an empty document.
pub fn render(
    conversation: &Conversation,
    include: &IncludeMessages,
    format: ExportFormat,
) -> Result<Vec<u8>, EncodeError> {
    let filtered = conversation.filtered(include);
    if filtered.messages.is_empty() {
        return Err(EncodeError::EmptyConversation);
    }
    encoder_for(format).encode(&filtered)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_for_matches_format() {
        for format in ExportFormat::all() {
            assert_eq!(encoder_for(*format).format(), *format);
        }
    }

    #[test]
    fn test_render_rejects_empty_selection() {
        let mut conv = fixtures::conversation();
        conv.messages.retain(|m| m.role == crate::Role::User);
        let err = render(
            &conv,
            &IncludeMessages {
                user: false,
                assistant: true,
            },
            ExportFormat::Text,
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::EmptyConversation));
    }

    #[test]
    fn test_render_every_format_produces_bytes() {
        let conv = fixtures::conversation();
        for format in ExportFormat::all() {
            let bytes = render(&conv, &IncludeMessages::all(), *format).unwrap();
            assert!(!bytes.is_empty(), "{} produced no output", format);
        }
    }

    #[test]
    fn test_encode_error_converts_to_core_error() {
        let err: gptexport_core::Error = EncodeError::EmptyConversation.into();
        assert!(matches!(err, gptexport_core::Error::Encode(_)));
    }
}
