//! In-process state shared by every concurrent flow.
//!
//! - [`SubmissionStore`] holds at most one pending submission per user
//! - [`CooldownTracker`] rate-limits each (user, command) pair
//!
//! Neither is persisted. A restart drops pending submissions and resets
//! cooldowns.

#![deny(unsafe_code)]

pub mod cooldown;
pub mod submissions;

pub use cooldown::{CooldownError, CooldownTracker};
pub use submissions::SubmissionStore;
