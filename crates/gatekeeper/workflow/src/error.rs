use crate::transport::TransportError;
use gatekeeper_ledger::LedgerError;
use gatekeeper_roles::RoleServiceError;
use gatekeeper_store::CooldownError;
use gatekeeper_types::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Result type for flow steps.
pub type FlowResult<T> = Result<T, FlowError>;

/// Reviewer delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("reviewer delivery failed: {0}")]
    Transport(#[from] TransportError),

    #[error("reviewer delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a flow ended in `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("missing required role `{role}`")]
    NotAuthorized { role: String },

    #[error(transparent)]
    Cooldown(#[from] CooldownError),

    #[error("ledger write failed: {0}")]
    LedgerWrite(#[from] LedgerError),

    #[error("role service failed: {0}")]
    RoleService(#[from] RoleServiceError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl FlowError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::Validation(_) => "validation",
            FlowError::NotAuthorized { .. } => "not_authorized",
            FlowError::Cooldown(_) => "cooldown",
            FlowError::LedgerWrite(_) => "ledger_write",
            FlowError::RoleService(_) => "role_service",
            FlowError::Notification(_) => "notification",
        }
    }

    /// Text shown to the user who started the flow, before anything was
    /// written to the ledger.
    pub fn user_message(&self) -> String {
        self.user_message_with(false)
    }

    /// Text shown to the user who started the flow. `recorded` says whether
    /// the flow had already written its ledger row.
    pub fn user_message_with(&self, recorded: bool) -> String {
        match self {
            FlowError::Validation(err) => format!("❌ {}.", capitalize(&err.to_string())),
            FlowError::NotAuthorized { role } => format!(
                "❌ You need the **{}** role to publish. Use /verify first.",
                role
            ),
            FlowError::Cooldown(err) => format!("⏳ {}.", err),
            FlowError::LedgerWrite(err) if err.committed_row().is_some() => {
                "❌ Your verification was saved but could not be completed. Submit /verify again to finish it."
                    .to_string()
            }
            FlowError::LedgerWrite(_) => {
                "❌ We couldn't record your verification right now. Please try again later."
                    .to_string()
            }
            FlowError::RoleService(RoleServiceError::MemberNotFound(_)) if recorded => {
                "❌ Your verification was recorded, but you could not be found as a member of this server."
                    .to_string()
            }
            FlowError::RoleService(RoleServiceError::MemberNotFound(_)) => {
                "❌ You could not be found as a member of this server.".to_string()
            }
            FlowError::RoleService(_) if recorded => {
                "❌ Your verification was recorded, but the role could not be granted. Submit /verify again later or contact a moderator."
                    .to_string()
            }
            FlowError::RoleService(_) => {
                "❌ Roles cannot be checked right now. Please try again later or contact a moderator."
                    .to_string()
            }
            FlowError::Notification(_) => {
                "❌ Your submission could not be delivered to the owner. Please send your message again."
                    .to_string()
            }
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_types::UserId;

    #[test]
    fn test_codes() {
        assert_eq!(
            FlowError::from(ValidationError::MissingField("title")).code(),
            "validation"
        );
        assert_eq!(
            FlowError::NotAuthorized {
                role: "Registered Creator".into()
            }
            .code(),
            "not_authorized"
        );
        assert_eq!(
            FlowError::from(LedgerError::Unreachable("down".into())).code(),
            "ledger_write"
        );
    }

    #[test]
    fn test_validation_message() {
        let err = FlowError::from(ValidationError::MissingField("title"));
        assert_eq!(err.user_message(), "❌ The field `title` is required.");
    }

    #[test]
    fn test_member_not_found_message_differs_from_grant_failure() {
        let missing = FlowError::from(RoleServiceError::MemberNotFound(UserId::new(1)));
        let failed = FlowError::from(RoleServiceError::GrantFailed("no perms".into()));
        assert_ne!(missing.user_message_with(true), failed.user_message_with(true));
        assert!(missing.user_message_with(true).contains("recorded"));
    }

    #[test]
    fn test_role_timeout_message_depends_on_ledger_write() {
        let err = FlowError::from(RoleServiceError::Timeout(Duration::from_secs(10)));
        assert!(err.user_message_with(true).contains("recorded"));
        assert!(!err.user_message_with(false).contains("recorded"));
        assert_eq!(err.user_message(), err.user_message_with(false));
    }

    #[test]
    fn test_partially_committed_ledger_message() {
        let err = FlowError::from(LedgerError::PartiallyCommitted {
            row: Box::new(gatekeeper_types::LedgerRow {
                row: 2,
                username: "Alice".into(),
                user_id: "123".into(),
                count_formula: String::new(),
                score_formula: String::new(),
            }),
            reason: "row count changed".into(),
        });
        assert!(err.user_message().contains("saved"));
        assert_eq!(err.code(), "ledger_write");
    }

    #[test]
    fn test_cooldown_message() {
        let err = FlowError::from(CooldownError {
            command: "verify".into(),
            retry_after: Duration::from_secs(3),
        });
        assert_eq!(
            err.user_message(),
            "⏳ `/verify` is on cooldown, try again in 3s."
        );
    }
}
