//! Gatekeeper workflow orchestrator
//!
//! Drives three user-initiated flows through one state machine:
//!
//! - **post**: a form is stored, and the user's next message delivers it to
//!   the reviewer together with its first attachment
//! - **publish**: role holders submit an item that is forwarded to the
//!   reviewer
//! - **verify**: an acknowledged identity record is appended to the ledger
//!   and converted into a role grant
//!
//! Every handled event produces a [`FlowReport`]. Every terminal path sends
//! exactly one acknowledgement to the initiating user, and a rejected flow
//! commits nothing. The one accepted exception is a verify flow whose role
//! grant fails after the ledger append: the row stays, and the
//! inconsistency is logged and kept in the [`AnomalyJournal`].
//!
//! Events for different users run concurrently; events for the same user
//! are serialised.

#![deny(unsafe_code)]

mod error;
pub mod events;
pub mod journal;
mod locks;
pub mod messages;
pub mod notify;
mod orchestrator;
pub mod recording;
mod settings;
pub mod state;
pub mod transport;

pub use error::{FlowError, FlowResult, NotificationError};
pub use events::{InboundEvent, IncomingMessage};
pub use journal::{AnomalyJournal, DeliveryFailure, OrphanedRow};
pub use notify::{DirectMessageSink, NotificationSink};
pub use orchestrator::WorkflowOrchestrator;
pub use recording::{Outbound, RecordingTransport};
pub use settings::{command, WorkflowSettings};
pub use state::{Acknowledgement, FlowOutcome, FlowReport, FlowState, FlowTrigger};
pub use transport::{ChatTransport, TransportError};
