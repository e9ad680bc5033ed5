//! Conversation model and ChatGPT conversation JSON parsing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use gptexport_protocol::{ExportFormat, IncludeMessages};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::encoder::EncodeError;

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    fn from_author(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
            Self::Tool => "Tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Keep only the message kinds the user asked for. System and tool
    /// messages are never exported.
    pub fn filtered(&self, include: &IncludeMessages) -> Conversation {
        let messages = self
            .messages
            .iter()
            .filter(|m| match m.role {
                Role::User => include.user,
                Role::Assistant => include.assistant,
                Role::System | Role::Tool => false,
            })
            .cloned()
            .collect();
        Conversation {
            messages,
            ..self.clone()
        }
    }
}

/// Parse a conversation from either ChatGPT's `mapping` tree or a flat
/// `{ title, messages: [{ role, content }] }` document.
pub fn parse_conversation(raw: &Value) -> Result<Conversation, EncodeError> {
    let id = raw
        .get("conversation_id")
        .or_else(|| raw.get("id"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let title = raw
        .get("title")
        .and_then(|v| v.as_str())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("Untitled")
        .to_string();
    let created_at = raw.get("create_time").and_then(timestamp);
    let url = raw.get("url").and_then(|v| v.as_str()).map(String::from);

    let messages = if let Some(mapping) = raw.get("mapping").and_then(|m| m.as_object()) {
        let current = raw.get("current_node").and_then(|v| v.as_str());
        mapping_messages(mapping, current)
    } else if let Some(list) = raw.get("messages").and_then(|m| m.as_array()) {
        list.iter().filter_map(flat_message).collect()
    } else {
        return Err(EncodeError::Malformed(
            "expected a `mapping` tree or a `messages` array".into(),
        ));
    };

    debug!("Parsed conversation {}: {} messages", id, messages.len());

    Ok(Conversation {
        id,
        title,
        url,
        created_at,
        messages,
    })
}

/// Walk the active branch when `current_node` is known; otherwise fall back
/// to every node ordered by creation time.
fn mapping_messages(mapping: &serde_json::Map<String, Value>, current: Option<&str>) -> Vec<Message> {
    if let Some(leaf) = current.filter(|id| mapping.contains_key(*id)) {
        let mut chain = Vec::new();
        let mut cursor = Some(leaf.to_string());
        let mut seen = HashSet::new();
        while let Some(id) = cursor {
            if !seen.insert(id.clone()) {
                break;
            }
            let Some(node) = mapping.get(&id) else { break };
            if let Some(msg) = node.get("message").and_then(node_message) {
                chain.push(msg);
            }
            cursor = node
                .get("parent")
                .and_then(|p| p.as_str())
                .map(String::from);
        }
        chain.reverse();
        return chain;
    }

    let mut list: Vec<Message> = mapping
        .values()
        .filter_map(|node| node.get("message").and_then(node_message))
        .collect();
    list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    list
}

fn node_message(message: &Value) -> Option<Message> {
    let role = message
        .get("author")
        .and_then(|a| a.get("role"))
        .and_then(|r| r.as_str())
        .and_then(Role::from_author)?;
    if role == Role::System {
        return None;
    }
    let content = content_text(message.get("content"));
    if content.is_empty() {
        return None;
    }
    Some(Message {
        role,
        content,
        created_at: message.get("create_time").and_then(timestamp),
    })
}

fn flat_message(message: &Value) -> Option<Message> {
    let role = message
        .get("role")
        .and_then(|r| r.as_str())
        .and_then(Role::from_author)?;
    let content = match message.get("content") {
        Some(Value::String(s)) => s.clone(),
        other => content_text(other),
    };
    if content.is_empty() {
        return None;
    }
    Some(Message {
        role,
        content,
        created_at: message
            .get("create_time")
            .or_else(|| message.get("createdAt"))
            .and_then(timestamp),
    })
}

/// `content.parts` holds strings (and non-text objects we skip); older
/// payloads carry `content.text`.
fn content_text(content: Option<&Value>) -> String {
    let Some(content) = content else {
        return String::new();
    };

    if let Some(parts) = content.get("parts").and_then(|p| p.as_array()) {
        return parts
            .iter()
            .filter_map(|p| p.as_str())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }

    content
        .get("text")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string()
}

/// Epoch seconds (float) or an RFC 3339 string.
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9) as u32;
            DateTime::from_timestamp(whole, nanos)
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

/// File name for an export: sanitized title plus the format's extension.
pub fn suggested_filename(conversation: &Conversation, format: ExportFormat) -> String {
    let safe_title: String = conversation
        .title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == ' ' || c == '-' { c } else { '_' })
        .take(50)
        .collect();
    let stem = safe_title.trim();
    let stem = if stem.is_empty() { "conversation" } else { stem };
    format!("{}.{}", stem, format.extension())
}
