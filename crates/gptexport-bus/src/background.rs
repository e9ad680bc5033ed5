//! The popup's line to the background dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use gptexport_core::{Error, Result};
use gptexport_dispatch::Dispatcher;
use gptexport_protocol::{Endpoint, MessageBus, Reply, Request};
use tracing::warn;

pub struct BackgroundLink {
    dispatcher: Arc<Dispatcher>,
}

impl BackgroundLink {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl MessageBus for BackgroundLink {
    async fn send(&self, to: Endpoint, request: Request) -> Result<Reply> {
        match to {
            Endpoint::Background => Ok(self.dispatcher.handle(request).await),
            Endpoint::ContentScript(_) => {
                warn!("Popup tried to reach {} directly", to);
                Err(Error::AgentUnreachable(to.to_string()))
            }
        }
    }
}
