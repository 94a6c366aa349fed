//! In-memory role directory.
//!
//! Suitable for development and tests. Counts calls per operation and can
//! be told to fail grants, stall, or lose a creation race.

use crate::{DirectoryError, RoleDirectory};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gatekeeper_types::{CommunityId, MemberHandle, RoleHandle, RoleId, UserId};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Calls received by an [`InMemoryRoleDirectory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryCalls {
    pub get_role_by_name: u32,
    pub create_role: u32,
    pub get_member: u32,
    pub add_role: u32,
}

impl DirectoryCalls {
    /// Calls that change upstream state.
    pub fn mutations(&self) -> u32 {
        self.create_role + self.add_role
    }
}

pub struct InMemoryRoleDirectory {
    roles: DashMap<(CommunityId, String), RoleHandle>,
    members: DashMap<(CommunityId, UserId), MemberHandle>,
    next_role_id: AtomicU64,
    get_role_calls: AtomicU32,
    create_calls: AtomicU32,
    get_member_calls: AtomicU32,
    add_role_calls: AtomicU32,
    fail_add_role: AtomicBool,
    lose_next_creation: AtomicBool,
    delay_ms: AtomicU32,
}

impl InMemoryRoleDirectory {
    pub fn new() -> Self {
        Self {
            roles: DashMap::new(),
            members: DashMap::new(),
            next_role_id: AtomicU64::new(1000),
            get_role_calls: AtomicU32::new(0),
            create_calls: AtomicU32::new(0),
            get_member_calls: AtomicU32::new(0),
            add_role_calls: AtomicU32::new(0),
            fail_add_role: AtomicBool::new(false),
            lose_next_creation: AtomicBool::new(false),
            delay_ms: AtomicU32::new(0),
        }
    }

    /// Register `user` as a member holding no roles.
    pub fn add_member(&self, community: CommunityId, user: UserId) {
        self.members
            .entry((community, user))
            .or_insert_with(|| MemberHandle {
                user,
                community,
                roles: Vec::new(),
            });
    }

    /// Create a role without counting it as a call.
    pub fn seed_role(&self, community: CommunityId, name: &str) -> RoleHandle {
        self.roles
            .entry((community, name.to_string()))
            .or_insert_with(|| self.new_handle(community, name))
            .clone()
    }

    /// Give `user` the role named `name` without counting it as a call.
    pub fn seed_grant(&self, community: CommunityId, user: UserId, name: &str) {
        let role = self.seed_role(community, name);
        self.add_member(community, user);
        if let Some(mut member) = self.members.get_mut(&(community, user)) {
            if !member.roles.contains(&role.id) {
                member.roles.push(role.id);
            }
        }
    }

    pub fn set_fail_add_role(&self, fail: bool) {
        self.fail_add_role.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        let ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    /// The next `create_role` finds that someone else created the role
    /// between our lookup and our create.
    pub fn simulate_creation_race(&self) {
        self.lose_next_creation.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> DirectoryCalls {
        DirectoryCalls {
            get_role_by_name: self.get_role_calls.load(Ordering::SeqCst),
            create_role: self.create_calls.load(Ordering::SeqCst),
            get_member: self.get_member_calls.load(Ordering::SeqCst),
            add_role: self.add_role_calls.load(Ordering::SeqCst),
        }
    }

    pub fn role_count(&self, community: CommunityId) -> usize {
        self.roles.iter().filter(|r| r.key().0 == community).count()
    }

    pub fn member_roles(&self, community: CommunityId, user: UserId) -> Vec<RoleId> {
        self.members
            .get(&(community, user))
            .map(|m| m.roles.clone())
            .unwrap_or_default()
    }

    fn new_handle(&self, community: CommunityId, name: &str) -> RoleHandle {
        RoleHandle {
            id: RoleId(self.next_role_id.fetch_add(1, Ordering::SeqCst)),
            community,
            name: name.to_string(),
        }
    }

    async fn enter(&self, counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
        }
    }
}

impl Default for InMemoryRoleDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleDirectory for InMemoryRoleDirectory {
    async fn get_role_by_name(
        &self,
        community: CommunityId,
        name: &str,
    ) -> Result<Option<RoleHandle>, DirectoryError> {
        self.enter(&self.get_role_calls).await;
        Ok(self
            .roles
            .get(&(community, name.to_string()))
            .map(|r| r.clone()))
    }

    async fn create_role(
        &self,
        community: CommunityId,
        name: &str,
    ) -> Result<RoleHandle, DirectoryError> {
        self.enter(&self.create_calls).await;

        if self.lose_next_creation.swap(false, Ordering::SeqCst) {
            self.seed_role(community, name);
            return Err(DirectoryError::NameTaken(name.to_string()));
        }

        match self.roles.entry((community, name.to_string())) {
            Entry::Occupied(_) => Err(DirectoryError::NameTaken(name.to_string())),
            Entry::Vacant(entry) => Ok(entry.insert(self.new_handle(community, name)).clone()),
        }
    }

    async fn get_member(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> Result<Option<MemberHandle>, DirectoryError> {
        self.enter(&self.get_member_calls).await;
        Ok(self.members.get(&(community, user)).map(|m| m.clone()))
    }

    async fn add_role(
        &self,
        member: &MemberHandle,
        role: &RoleHandle,
    ) -> Result<(), DirectoryError> {
        self.enter(&self.add_role_calls).await;

        if self.fail_add_role.load(Ordering::SeqCst) {
            return Err(DirectoryError::Rejected("missing permissions".to_string()));
        }
        if member.community != role.community {
            return Err(DirectoryError::Rejected(
                "role belongs to another community".to_string(),
            ));
        }

        let mut stored = self
            .members
            .get_mut(&(member.community, member.user))
            .ok_or_else(|| DirectoryError::Rejected(format!("unknown member {}", member.user)))?;
        if !stored.roles.contains(&role.id) {
            stored.roles.push(role.id);
        }
        Ok(())
    }
}
