//! Transport that prints every outbound delivery as a JSON line.

use async_trait::async_trait;
use gatekeeper_types::{FormKind, MessageRef, Notice, UserId};
use gatekeeper_workflow::{ChatTransport, Outbound, TransportError};
use std::io::Write;
use std::sync::Mutex;

pub struct ConsoleTransport {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleTransport {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn emit(&self, outbound: &Outbound) -> Result<(), TransportError> {
        let line = render(outbound)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| TransportError::Unavailable("console lock poisoned".to_string()))?;
        writeln!(out, "{}", line)
            .and_then(|()| out.flush())
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }
}

/// One outbound delivery as a single line of JSON.
pub fn render(outbound: &Outbound) -> Result<String, TransportError> {
    serde_json::to_string(outbound).map_err(|e| TransportError::Unavailable(e.to_string()))
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn reply_ephemeral(&self, user: UserId, text: &str) -> Result<(), TransportError> {
        self.emit(&Outbound::Ephemeral {
            user,
            text: text.to_string(),
        })
    }

    async fn send_direct(&self, user: UserId, notice: &Notice) -> Result<(), TransportError> {
        self.emit(&Outbound::Direct {
            user,
            notice: notice.clone(),
        })
    }

    async fn reply(&self, message: MessageRef, text: &str) -> Result<(), TransportError> {
        self.emit(&Outbound::Reply {
            message,
            text: text.to_string(),
        })
    }

    async fn present_form(&self, user: UserId, form: FormKind) -> Result<(), TransportError> {
        self.emit(&Outbound::Form { user, form })
    }
}
