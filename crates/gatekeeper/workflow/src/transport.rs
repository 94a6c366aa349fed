//! Outbound side of the chat transport.

use async_trait::async_trait;
use gatekeeper_types::{FormKind, MessageRef, Notice, UserId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("recipient unreachable: {0}")]
    Unreachable(String),
}

/// What the core asks the chat platform to deliver.
///
/// Rendering (form controls, embeds, markdown) is the implementor's
/// business.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// A reply only `user` can see, in the context of their last command
    /// or form.
    async fn reply_ephemeral(&self, user: UserId, text: &str) -> Result<(), TransportError>;

    /// A direct message.
    async fn send_direct(&self, user: UserId, notice: &Notice) -> Result<(), TransportError>;

    /// A threaded reply to a message.
    async fn reply(&self, message: MessageRef, text: &str) -> Result<(), TransportError>;

    /// Show `form` to `user` in response to their command.
    async fn present_form(&self, user: UserId, form: FormKind) -> Result<(), TransportError>;
}
