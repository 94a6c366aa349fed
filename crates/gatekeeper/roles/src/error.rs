use gatekeeper_types::UserId;
use std::time::Duration;
use thiserror::Error;

/// Result type for role service operations.
pub type RoleResult<T> = Result<T, RoleServiceError>;

/// Errors reported by the role-authorization system itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Another caller created a role with this name first.
    #[error("a role named `{0}` already exists")]
    NameTaken(String),

    #[error("role directory unavailable: {0}")]
    Unavailable(String),

    #[error("role directory rejected the request: {0}")]
    Rejected(String),
}

/// Role service failures surfaced to a flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleServiceError {
    #[error("user {0} is not a member of this community")]
    MemberNotFound(UserId),

    #[error("role `{0}` was reported taken but could not be found")]
    RoleVanished(String),

    #[error("role grant failed: {0}")]
    GrantFailed(String),

    #[error("role directory call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
