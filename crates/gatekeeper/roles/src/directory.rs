use crate::DirectoryError;
use async_trait::async_trait;
use gatekeeper_types::{CommunityId, MemberHandle, RoleHandle, UserId};

/// The external role-authorization system.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Exact, case-sensitive name lookup.
    async fn get_role_by_name(
        &self,
        community: CommunityId,
        name: &str,
    ) -> Result<Option<RoleHandle>, DirectoryError>;

    /// Create a role. Fails with [`DirectoryError::NameTaken`] when a role
    /// of that name appeared concurrently.
    async fn create_role(
        &self,
        community: CommunityId,
        name: &str,
    ) -> Result<RoleHandle, DirectoryError>;

    async fn get_member(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> Result<Option<MemberHandle>, DirectoryError>;

    async fn add_role(&self, member: &MemberHandle, role: &RoleHandle)
        -> Result<(), DirectoryError>;
}
