//! Transport that records what it was asked to send.
//!
//! Used by tests and by local replay runs where no chat platform is
//! attached.

use crate::transport::{ChatTransport, TransportError};
use async_trait::async_trait;
use gatekeeper_types::{FormKind, MessageRef, Notice, UserId};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One outbound delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Ephemeral { user: UserId, text: String },
    Direct { user: UserId, notice: Notice },
    Reply { message: MessageRef, text: String },
    Form { user: UserId, form: FormKind },
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Outbound>>,
    fail_direct: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every direct message fail as if the recipient blocked the bot.
    pub fn set_fail_direct(&self, fail: bool) {
        self.fail_direct.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Ephemeral replies and forms shown to `user`.
    pub fn acknowledgements_to(&self, user: UserId) -> Vec<Outbound> {
        self.sent()
            .into_iter()
            .filter(|o| match o {
                Outbound::Ephemeral { user: u, .. } | Outbound::Form { user: u, .. } => *u == user,
                _ => false,
            })
            .collect()
    }

    pub fn replies_to(&self, message: MessageRef) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Reply { message: m, text } if m == message => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn direct_messages_to(&self, user: UserId) -> Vec<Notice> {
        self.sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Direct { user: u, notice } if u == user => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }

    fn record(&self, outbound: Outbound) -> Result<(), TransportError> {
        self.sent
            .lock()
            .map_err(|_| TransportError::Unavailable("recording lock poisoned".to_string()))?
            .push(outbound);
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn reply_ephemeral(&self, user: UserId, text: &str) -> Result<(), TransportError> {
        self.record(Outbound::Ephemeral {
            user,
            text: text.to_string(),
        })
    }

    async fn send_direct(&self, user: UserId, notice: &Notice) -> Result<(), TransportError> {
        if self.fail_direct.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable(format!(
                "cannot send messages to user {}",
                user
            )));
        }
        self.record(Outbound::Direct {
            user,
            notice: notice.clone(),
        })
    }

    async fn reply(&self, message: MessageRef, text: &str) -> Result<(), TransportError> {
        self.record(Outbound::Reply {
            message,
            text: text.to_string(),
        })
    }

    async fn present_form(&self, user: UserId, form: FormKind) -> Result<(), TransportError> {
        self.record(Outbound::Form { user, form })
    }
}
