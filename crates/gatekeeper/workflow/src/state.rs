//! Flow states and the record of one handled event.
//!
//! ```text
//! Received ─┬─> Validated ─┬─> Stored ─┬─> Notified ─> Acknowledged
//!           │              │           └─> Acknowledged
//!           │              ├─> LedgerWritten ─┬─> RoleGranted ─> Acknowledged
//!           │              │                  └─> Rejected
//!           │              ├─> Acknowledged   (already verified)
//!           │              └─> Rejected
//!           ├─> Notified ─> Acknowledged      (pending post consumed)
//!           ├─> Acknowledged                  (form shown, already verified)
//!           └─> Rejected
//! ```

use crate::FlowError;
use gatekeeper_types::{FlowId, FormKind, UserId};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Received,
    Validated,
    Stored,
    Notified,
    LedgerWritten,
    RoleGranted,
    Acknowledged,
    Rejected,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Acknowledged | FlowState::Rejected)
    }

    pub fn can_transition_to(&self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Received, Validated | Notified | Acknowledged | Rejected)
                | (Validated, Stored | LedgerWritten | Acknowledged | Rejected)
                | (Stored, Notified | Acknowledged)
                | (Notified, Acknowledged)
                | (LedgerWritten, RoleGranted | Rejected)
                | (RoleGranted, Acknowledged)
        )
    }
}

/// What started a flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowTrigger {
    Command { name: String },
    Form { form: FormKind },
    Message,
}

/// The single acknowledgement sent on a successful terminal path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Acknowledgement {
    Text(String),
    FormShown(FormKind),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowOutcome {
    Acknowledged(Acknowledgement),
    Rejected(FlowError),
    /// Not part of any flow; nothing was sent.
    Ignored,
}

/// Everything that happened while handling one inbound event.
#[derive(Clone, Debug)]
pub struct FlowReport {
    pub flow_id: FlowId,
    pub user: UserId,
    pub trigger: FlowTrigger,
    pub states: Vec<FlowState>,
    pub outcome: FlowOutcome,
}

impl FlowReport {
    pub fn final_state(&self) -> FlowState {
        self.states.last().copied().unwrap_or(FlowState::Received)
    }

    pub fn is_acknowledged(&self) -> bool {
        matches!(self.outcome, FlowOutcome::Acknowledged(_))
    }

    pub fn error(&self) -> Option<&FlowError> {
        match &self.outcome {
            FlowOutcome::Rejected(err) => Some(err),
            _ => None,
        }
    }

    pub fn acknowledgement(&self) -> Option<&Acknowledgement> {
        match &self.outcome {
            FlowOutcome::Acknowledged(ack) => Some(ack),
            _ => None,
        }
    }

    pub fn visited(&self, state: FlowState) -> bool {
        self.states.contains(&state)
    }
}

/// Builder that enforces legal transitions while a flow runs.
#[derive(Debug)]
pub(crate) struct FlowTrace {
    flow_id: FlowId,
    user: UserId,
    trigger: FlowTrigger,
    states: Vec<FlowState>,
}

impl FlowTrace {
    pub(crate) fn start(user: UserId, trigger: FlowTrigger) -> Self {
        Self {
            flow_id: FlowId::generate(),
            user,
            trigger,
            states: vec![FlowState::Received],
        }
    }

    pub(crate) fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    pub(crate) fn visited(&self, state: FlowState) -> bool {
        self.states.contains(&state)
    }

    pub(crate) fn current(&self) -> FlowState {
        self.states.last().copied().unwrap_or(FlowState::Received)
    }

    pub(crate) fn advance(&mut self, next: FlowState) {
        let current = self.current();
        if !current.can_transition_to(next) {
            error!(
                flow = %self.flow_id.short(),
                from = ?current,
                to = ?next,
                "Illegal flow transition"
            );
            debug_assert!(false, "illegal flow transition {:?} -> {:?}", current, next);
        }
        debug!(flow = %self.flow_id.short(), from = ?current, to = ?next, "Flow transition");
        self.states.push(next);
    }

    pub(crate) fn finish(self, outcome: FlowOutcome) -> FlowReport {
        FlowReport {
            flow_id: self.flow_id,
            user: self.user,
            trigger: self.trigger,
            states: self.states,
            outcome,
        }
    }
}
