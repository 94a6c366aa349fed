//! Anomalies the workflow accepts instead of rolling back.
//!
//! Two kinds are kept: ledger rows committed for a user whose verify flow
//! then failed, and reviewer notices that could not be delivered. Both are
//! logged at error level. An orphaned row is resolved when the same user
//! verifies again; anything else waits for an operator.

use chrono::{DateTime, Utc};
use gatekeeper_types::{LedgerRow, SubmissionKind, UserId};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

/// A ledger row with no matching role grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrphanedRow {
    pub user: UserId,
    pub row: LedgerRow,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// A reviewer notice that never arrived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub user: UserId,
    pub kind: SubmissionKind,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Entries kept per list before the oldest are dropped.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 1000;

/// Bounded record of anomalies, drained by an operator or resolved by a
/// later successful flow.
///
/// A user has at most one orphaned row: a verify retry reuses it instead of
/// appending another, and resolves it once the role is granted.
#[derive(Debug)]
pub struct AnomalyJournal {
    capacity: usize,
    orphaned_rows: Mutex<Vec<OrphanedRow>>,
    delivery_failures: Mutex<Vec<DeliveryFailure>>,
}

impl Default for AnomalyJournal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl AnomalyJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            orphaned_rows: Mutex::new(Vec::new()),
            delivery_failures: Mutex::new(Vec::new()),
        }
    }

    pub fn record_orphaned_row(&self, user: UserId, row: LedgerRow, reason: impl Into<String>) {
        let reason = reason.into();
        error!(
            user = %user,
            row = row.row,
            username = %row.username,
            reason = %reason,
            "Ledger row committed without role grant"
        );
        let entry = OrphanedRow {
            user,
            row,
            reason,
            recorded_at: Utc::now(),
        };
        let mut rows = lock(&self.orphaned_rows);
        rows.retain(|existing| existing.user != user);
        push_bounded(&mut rows, entry, self.capacity, "orphaned row");
    }

    /// The row a failed verify left for `user`, if it is still unresolved.
    pub fn orphaned_row_for(&self, user: UserId) -> Option<OrphanedRow> {
        lock(&self.orphaned_rows)
            .iter()
            .find(|entry| entry.user == user)
            .cloned()
    }

    /// Forget `user`'s orphaned row once it has its role.
    pub fn resolve_orphaned_row(&self, user: UserId) -> Option<OrphanedRow> {
        let mut rows = lock(&self.orphaned_rows);
        let position = rows.iter().position(|entry| entry.user == user)?;
        let entry = rows.remove(position);
        info!(user = %user, row = entry.row.row, "Orphaned ledger row resolved");
        Some(entry)
    }

    pub fn record_delivery_failure(
        &self,
        user: UserId,
        kind: SubmissionKind,
        reason: impl Into<String>,
    ) {
        let reason = reason.into();
        error!(user = %user, kind = %kind, reason = %reason, "Reviewer notification failed");
        let entry = DeliveryFailure {
            user,
            kind,
            reason,
            recorded_at: Utc::now(),
        };
        push_bounded(
            &mut lock(&self.delivery_failures),
            entry,
            self.capacity,
            "delivery failure",
        );
    }

    pub fn orphaned_rows(&self) -> Vec<OrphanedRow> {
        lock(&self.orphaned_rows).clone()
    }

    pub fn delivery_failures(&self) -> Vec<DeliveryFailure> {
        lock(&self.delivery_failures).clone()
    }

    /// Take every recorded delivery failure, leaving the list empty.
    pub fn drain_delivery_failures(&self) -> Vec<DeliveryFailure> {
        std::mem::take(&mut *lock(&self.delivery_failures))
    }
}

fn lock<T>(entries: &Mutex<Vec<T>>) -> MutexGuard<'_, Vec<T>> {
    match entries.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn push_bounded<T>(entries: &mut Vec<T>, entry: T, capacity: usize, what: &str) {
    if entries.len() >= capacity {
        let dropped = entries.len() + 1 - capacity;
        entries.drain(..dropped);
        warn!(capacity, dropped, kind = what, "Journal full; oldest entries dropped");
    }
    entries.push(entry);
}
