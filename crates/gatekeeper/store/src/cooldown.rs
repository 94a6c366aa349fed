//! Per (user, command) rate limiting
//!
//! A command is accepted at most once per window. A call inside the window
//! is rejected and does not extend it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gatekeeper_types::UserId;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// A command was invoked again before its cooldown elapsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`/{command}` is on cooldown, try again in {}s", .retry_after.as_secs().max(1))]
pub struct CooldownError {
    pub command: String,
    pub retry_after: Duration,
}

/// Tracks when each user last invoked each command.
#[derive(Debug)]
pub struct CooldownTracker {
    window: Duration,
    last_accepted: DashMap<(UserId, String), Instant>,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Accept the invocation and start a new window, or reject it.
    pub fn try_acquire(&self, user: UserId, command: &str) -> Result<(), CooldownError> {
        if self.window.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        match self.last_accepted.entry((user, command.to_string())) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if elapsed < self.window {
                    let retry_after = self.window - elapsed;
                    debug!(user = %user, command, ?retry_after, "Command on cooldown");
                    return Err(CooldownError {
                        command: command.to_string(),
                        retry_after,
                    });
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }
        Ok(())
    }

    /// Drop entries whose window has already elapsed and return how many
    /// went. Concurrent acquisitions may land while this runs.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, accepted| now.saturating_duration_since(*accepted) < self.window);
        before.saturating_sub(self.last_accepted.len())
    }

    pub fn tracked(&self) -> usize {
        self.last_accepted.len()
    }
}
