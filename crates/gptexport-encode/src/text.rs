//! Plain text and Markdown transcripts.

use gptexport_protocol::ExportFormat;

use crate::conversation::Conversation;
use crate::encoder::{EncodeError, Encoder};

pub struct TextEncoder;

impl Encoder for TextEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn encode(&self, conversation: &Conversation) -> Result<Vec<u8>, EncodeError> {
        let mut out = String::new();
        out.push_str(&conversation.title);
        out.push('\n');
        out.push_str(&"=".repeat(conversation.title.chars().count().max(3)));
        out.push_str("\n\n");
        for message in &conversation.messages {
            out.push_str(message.role.label());
            out.push_str(":\n");
            out.push_str(message.content.trim_end());
            out.push_str("\n\n");
        }
        Ok(out.into_bytes())
    }
}

pub struct MarkdownEncoder;

impl Encoder for MarkdownEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn encode(&self, conversation: &Conversation) -> Result<Vec<u8>, EncodeError> {
        let mut out = format!("# {}\n\n", conversation.title);
        if let Some(url) = &conversation.url {
            out.push_str(&format!("<{}>\n\n", url));
        }
        let blocks: Vec<String> = conversation
            .messages
            .iter()
            .map(|m| format!("### {}\n\n{}\n", m.role.label(), m.content.trim_end()))
            .collect();
        out.push_str(&blocks.join("\n---\n\n"));
        Ok(out.into_bytes())
    }
}
