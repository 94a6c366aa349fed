//! Gatekeeper domain types
//!
//! Plain data crossing the boundary between the chat transport and the
//! workflow core. Nothing in here knows how a form is rendered or how a
//! ledger stores its rows; it only describes what was submitted and what
//! the core hands back.
//!
//! - [`UserId`], [`CommunityId`], [`MessageRef`] identify who and where
//! - [`FormFields`] is the raw, untyped payload of a submitted form
//! - [`PendingSubmission`], [`PublishSubmission`], [`VerificationRecord`]
//!   are the validated records built from it
//! - [`LedgerRow`] describes one appended verification row
//! - [`RoleHandle`] and [`MemberHandle`] mirror the role-authorization system
//! - [`Notice`] is the rich content delivered to the reviewer

#![deny(unsafe_code)]

mod error;
mod form;
mod identity;
mod ledger;
mod notice;
mod role;
mod submission;
mod verification;

pub use error::ValidationError;
pub use form::{field, FieldLimits, FormFields, FormKind};
pub use identity::{CommunityId, FlowId, MessageRef, UserId};
pub use ledger::{CellValue, LedgerRow};
pub use notice::{Notice, NoticeField};
pub use role::{MemberHandle, RoleHandle, RoleId};
pub use submission::{PendingSubmission, PostSubmission, PublishSubmission, SubmissionKind};
pub use verification::VerificationRecord;
