//! Standalone HTML page.

use gptexport_protocol::ExportFormat;

use crate::conversation::{Conversation, Role};
use crate::encoder::{EncodeError, Encoder};

pub struct HtmlEncoder;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem;color:#1f2328}\
h1{font-size:1.5rem}.meta{color:#656d76;font-size:.875rem}\
.message{border:1px solid #d0d7de;border-radius:.5rem;padding:.75rem 1rem;margin:1rem 0}\
.message.user{background:#f6f8fa}.role{font-weight:600;margin-bottom:.5rem}\
.content{white-space:pre-wrap;line-height:1.5}";

impl Encoder for HtmlEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn encode(&self, conversation: &Conversation) -> Result<Vec<u8>, EncodeError> {
        let title = escape(&conversation.title);
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str(&format!("<title>{}</title>\n", title));
        out.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
        out.push_str(&format!("<h1>{}</h1>\n", title));

        let mut meta = Vec::new();
        if let Some(created) = conversation.created_at {
            meta.push(format!("Created {}", created.format("%Y-%m-%d %H:%M UTC")));
        }
        if let Some(url) = &conversation.url {
            if is_web_url(url) {
                meta.push(format!("<a href=\"{0}\">{0}</a>", escape(url)));
            } else {
                meta.push(escape(url));
            }
        }
        if !meta.is_empty() {
            out.push_str(&format!("<p class=\"meta\">{}</p>\n", meta.join(" &middot; ")));
        }

        for message in &conversation.messages {
            let class = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
                Role::Tool => "tool",
            };
            out.push_str(&format!(
                "<section class=\"message {}\">\n<div class=\"role\">{}</div>\n<div class=\"content\">{}</div>\n</section>\n",
                class,
                message.role.label(),
                escape(&message.content)
            ));
        }

        out.push_str("</body>\n</html>\n");
        Ok(out.into_bytes())
    }
}

/// Only http(s) links are made clickable.
fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
