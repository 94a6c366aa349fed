use gatekeeper_types::{CommunityId, FieldLimits, UserId};
use std::time::Duration;

/// Slash command names.
pub mod command {
    pub const POST: &str = "post";
    pub const PUBLISH: &str = "publish";
    pub const VERIFY: &str = "verify";
}

/// Knobs of a [`crate::WorkflowOrchestrator`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    /// Community in which roles are checked and granted
    pub community: CommunityId,
    /// Receives post and publish notices
    pub reviewer: UserId,
    /// Role granted on verification and required to publish
    pub role_name: String,
    /// Text the verify form's acknowledgment field must match
    pub confirmation_phrase: String,
    pub limits: FieldLimits,
    pub command_cooldown: Duration,
    /// Upper bound on every transport, ledger and role call
    pub external_call_timeout: Duration,
}

impl WorkflowSettings {
    pub fn new(community: CommunityId, reviewer: UserId) -> Self {
        Self {
            community,
            reviewer,
            role_name: "Registered Creator".to_string(),
            confirmation_phrase: "I Agree".to_string(),
            limits: FieldLimits::default(),
            command_cooldown: Duration::from_secs(5),
            external_call_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = role_name.into();
        self
    }

    pub fn with_confirmation_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.confirmation_phrase = phrase.into();
        self
    }

    pub fn with_command_cooldown(mut self, cooldown: Duration) -> Self {
        self.command_cooldown = cooldown;
        self
    }

    pub fn with_external_call_timeout(mut self, timeout: Duration) -> Self {
        self.external_call_timeout = timeout;
        self
    }

    pub fn with_limits(mut self, limits: FieldLimits) -> Self {
        self.limits = limits;
        self
    }
}
