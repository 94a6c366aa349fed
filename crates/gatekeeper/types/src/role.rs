use crate::{CommunityId, UserId};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a role by the authorization system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub u64);

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named authorization role inside one community.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleHandle {
    pub id: RoleId,
    pub community: CommunityId,
    pub name: String,
}

/// A resolved community member and the roles they currently hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberHandle {
    pub user: UserId,
    pub community: CommunityId,
    pub roles: Vec<RoleId>,
}

impl MemberHandle {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}
