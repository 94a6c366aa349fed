//! Pending submission table
//!
//! One entry per user. Every mutation goes through a single shard lock of
//! the underlying map, so `put` and the `take_*` operations on the same key
//! never interleave.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gatekeeper_types::{PendingSubmission, PostSubmission, SubmissionKind, UserId};
use tracing::debug;

/// Maps a user to their single pending submission.
#[derive(Debug, Default)]
pub struct SubmissionStore {
    pending: DashMap<UserId, PendingSubmission>,
}

impl SubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `submission` for `user`, replacing whatever was pending.
    ///
    /// Returns the replaced submission, if any. Replacement is silent for
    /// the user; callers only use the return value for logging.
    pub fn put(
        &self,
        user: UserId,
        submission: impl Into<PendingSubmission>,
    ) -> Option<PendingSubmission> {
        let submission = submission.into();
        let kind = submission.kind();
        let previous = self.pending.insert(user, submission);
        if let Some(prev) = &previous {
            debug!(
                user = %user,
                replaced = %prev.kind(),
                with = %kind,
                "Pending submission superseded"
            );
        }
        previous
    }

    /// Remove and return the pending submission for `user`, if any.
    pub fn take_if_present(&self, user: UserId) -> Option<PendingSubmission> {
        self.pending.remove(&user).map(|(_, submission)| submission)
    }

    /// Remove and return the pending submission only if it is a post
    /// waiting for its media message.
    ///
    /// A pending publish submission is left untouched.
    pub fn take_pending_post(&self, user: UserId) -> Option<PostSubmission> {
        self.pending
            .remove_if(&user, |_, submission| {
                submission.kind() == SubmissionKind::Simple
            })
            .and_then(|(_, submission)| match submission {
                PendingSubmission::Simple(post) => Some(post),
                PendingSubmission::Publish(_) => None,
            })
    }

    /// Put back a submission taken by a flow that then failed, unless the
    /// user has started a new one meanwhile.
    pub fn restore(&self, user: UserId, submission: impl Into<PendingSubmission>) -> bool {
        match self.pending.entry(user) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(submission.into());
                true
            }
        }
    }

    pub fn get(&self, user: UserId) -> Option<PendingSubmission> {
        self.pending.get(&user).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.pending.contains_key(&user)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
