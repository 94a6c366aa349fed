//! Gatekeeper roles
//!
//! Reconciles verified users with an external role-authorization system.
//! [`RoleGrantService`] finds or creates a named role and grants it at most
//! once per member. Roles are never revoked from here.

#![deny(unsafe_code)]

mod directory;
mod error;
pub mod memory;
mod service;

pub use directory::RoleDirectory;
pub use error::{DirectoryError, RoleResult, RoleServiceError};
pub use memory::InMemoryRoleDirectory;
pub use service::{GrantOutcome, RoleGrantService};
