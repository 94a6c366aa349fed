//! Role get-or-create and idempotent grants.

use crate::{DirectoryError, RoleDirectory, RoleResult, RoleServiceError};
use gatekeeper_types::{CommunityId, MemberHandle, RoleHandle, UserId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of asking for a role to be granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    /// The member already held the role; nothing was sent upstream.
    AlreadyGranted,
    Failed(String),
}

/// Ensures roles exist and grants them exactly once.
pub struct RoleGrantService {
    directory: Arc<dyn RoleDirectory>,
    call_timeout: Duration,
}

impl RoleGrantService {
    pub fn new(directory: Arc<dyn RoleDirectory>, call_timeout: Duration) -> Self {
        Self {
            directory,
            call_timeout,
        }
    }

    /// Return the role named `name`, creating it on first use.
    ///
    /// Two callers may both miss the lookup and both try to create. The
    /// loser gets [`DirectoryError::NameTaken`] and re-reads the winner's
    /// role instead of failing.
    pub async fn ensure_role(&self, community: CommunityId, name: &str) -> RoleResult<RoleHandle> {
        if let Some(role) = self
            .bounded(self.directory.get_role_by_name(community, name))
            .await?
        {
            return Ok(role);
        }

        match self
            .bounded(self.directory.create_role(community, name))
            .await
        {
            Ok(role) => {
                info!(community = %community, role = %name, role_id = %role.id, "Role created");
                Ok(role)
            }
            Err(RoleServiceError::Directory(DirectoryError::NameTaken(_))) => {
                warn!(community = %community, role = %name, "Role created concurrently, re-fetching");
                self.bounded(self.directory.get_role_by_name(community, name))
                    .await?
                    .ok_or_else(|| RoleServiceError::RoleVanished(name.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve `user` as a member of the role's community.
    pub async fn resolve_member(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> RoleResult<MemberHandle> {
        self.bounded(self.directory.get_member(community, user))
            .await?
            .ok_or(RoleServiceError::MemberNotFound(user))
    }

    /// Grant `role` to `user`.
    ///
    /// Only an unresolvable member is an `Err`; upstream failures and
    /// timeouts come back as [`GrantOutcome::Failed`].
    pub async fn grant(&self, role: &RoleHandle, user: UserId) -> RoleResult<GrantOutcome> {
        let member = match self.resolve_member(role.community, user).await {
            Ok(member) => member,
            Err(RoleServiceError::MemberNotFound(user)) => {
                return Err(RoleServiceError::MemberNotFound(user))
            }
            Err(err) => return Ok(GrantOutcome::Failed(err.to_string())),
        };

        if member.has_role(role.id) {
            return Ok(GrantOutcome::AlreadyGranted);
        }

        match self.bounded(self.directory.add_role(&member, role)).await {
            Ok(()) => {
                info!(user = %user, role = %role.name, "Role granted");
                Ok(GrantOutcome::Granted)
            }
            Err(err) => {
                warn!(user = %user, role = %role.name, error = %err, "Role grant failed");
                Ok(GrantOutcome::Failed(err.to_string()))
            }
        }
    }

    /// Whether `user` currently holds the role named `name`.
    ///
    /// A missing role or a non-member both mean "no".
    pub async fn holds_role(
        &self,
        community: CommunityId,
        user: UserId,
        name: &str,
    ) -> RoleResult<bool> {
        let Some(role) = self
            .bounded(self.directory.get_role_by_name(community, name))
            .await?
        else {
            return Ok(false);
        };

        Ok(self
            .bounded(self.directory.get_member(community, user))
            .await?
            .is_some_and(|member| member.has_role(role.id)))
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, DirectoryError>>,
    ) -> RoleResult<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(RoleServiceError::from),
            Err(_) => Err(RoleServiceError::Timeout(self.call_timeout)),
        }
    }
}
