//! Pretty-printed JSON document.

use gptexport_protocol::ExportFormat;
use serde::Serialize;

use crate::conversation::{Conversation, Message};
use crate::encoder::{EncodeError, Encoder};

pub struct JsonEncoder;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Document<'a> {
    id: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    message_count: usize,
    messages: &'a [Message],
}

impl Encoder for JsonEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn encode(&self, conversation: &Conversation) -> Result<Vec<u8>, EncodeError> {
        let doc = Document {
            id: &conversation.id,
            title: &conversation.title,
            url: conversation.url.as_deref(),
            created_at: conversation.created_at.map(|t| t.to_rfc3339()),
            message_count: conversation.messages.len(),
            messages: &conversation.messages,
        };
        let mut bytes = serde_json::to_vec_pretty(&doc)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
