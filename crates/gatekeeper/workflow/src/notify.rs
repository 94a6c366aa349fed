//! Reviewer notifications.

use crate::transport::{ChatTransport, TransportError};
use async_trait::async_trait;
use gatekeeper_types::{Notice, UserId};
use std::sync::Arc;

/// Delivers a notice to the single designated reviewer.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notice: &Notice) -> Result<(), TransportError>;
}

/// Delivers notices as direct messages to the reviewer's account.
pub struct DirectMessageSink {
    transport: Arc<dyn ChatTransport>,
    reviewer: UserId,
}

impl DirectMessageSink {
    pub fn new(transport: Arc<dyn ChatTransport>, reviewer: UserId) -> Self {
        Self {
            transport,
            reviewer,
        }
    }

    pub fn reviewer(&self) -> UserId {
        self.reviewer
    }
}

#[async_trait]
impl NotificationSink for DirectMessageSink {
    async fn deliver(&self, notice: &Notice) -> Result<(), TransportError> {
        self.transport.send_direct(self.reviewer, notice).await
    }
}
