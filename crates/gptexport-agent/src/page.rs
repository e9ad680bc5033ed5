//! Reading the conversation shown on the page.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gptexport_core::{Error, Result};
use gptexport_encode::{parse_conversation, Conversation};

/// Where the agent reads the current conversation from.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    async fn read_conversation(&self) -> Result<Conversation>;
}

/// Conversation JSON saved from the ChatGPT backend.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ConversationSource for JsonFileSource {
    async fn read_conversation(&self) -> Result<Conversation> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", self.path.display(), e),
            ))
        })?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(parse_conversation(&value)?)
    }
}

/// A fixed conversation, or a fixed failure.
pub struct StaticSource {
    conversation: std::result::Result<Conversation, String>,
}

impl StaticSource {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation: Ok(conversation),
        }
    }

    /// A page the agent cannot read, e.g. not a conversation view.
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            conversation: Err(reason.into()),
        }
    }
}

#[async_trait]
impl ConversationSource for StaticSource {
    async fn read_conversation(&self) -> Result<Conversation> {
        self.conversation.clone().map_err(Error::Internal)
    }
}
