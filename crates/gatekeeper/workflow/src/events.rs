//! Inbound events from the chat transport.

use gatekeeper_types::{FormFields, FormKind, MessageRef, UserId};
use serde::{Deserialize, Serialize};

/// A message posted by a user in a channel the bot can read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_ref: MessageRef,
    pub author: UserId,
    #[serde(default)]
    pub author_is_bot: bool,
    #[serde(default)]
    pub text: String,
    /// Attachment URLs in the order they were uploaded.
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl IncomingMessage {
    pub fn new(message_ref: MessageRef, author: UserId, text: impl Into<String>) -> Self {
        Self {
            message_ref,
            author,
            author_is_bot: false,
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, url: impl Into<String>) -> Self {
        self.attachments.push(url.into());
        self
    }

    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }

    pub fn first_attachment(&self) -> Option<&str> {
        self.attachments.first().map(String::as_str)
    }
}

/// Everything the transport can report to the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    SlashCommand {
        name: String,
        user: UserId,
    },
    FormSubmitted {
        form: FormKind,
        user: UserId,
        #[serde(default)]
        fields: FormFields,
    },
    Message(IncomingMessage),
}

impl InboundEvent {
    /// The user whose flow this event belongs to.
    pub fn user(&self) -> UserId {
        match self {
            InboundEvent::SlashCommand { user, .. } | InboundEvent::FormSubmitted { user, .. } => {
                *user
            }
            InboundEvent::Message(message) => message.author,
        }
    }
}
