//! Event replay against an in-memory community.
//!
//! Each input line is one JSON-encoded [`InboundEvent`]. Lines are handled
//! one at a time in input order so a replay is deterministic; a slow ledger
//! or role call therefore holds up every later event. Blank lines are
//! skipped and malformed ones are logged and counted.

use crate::config::GatekeeperConfig;
use crate::error::DaemonResult;
use gatekeeper_ledger::{InMemoryLedger, LedgerWriter};
use gatekeeper_roles::{InMemoryRoleDirectory, RoleGrantService};
use gatekeeper_types::{CommunityId, UserId};
use gatekeeper_workflow::{
    ChatTransport, DeliveryFailure, FlowOutcome, InboundEvent, OrphanedRow, WorkflowOrchestrator,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

const LEDGER_HEADER: [&str; 4] = ["Username", "User ID", "Count", "Score"];

/// Tally of a replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub acknowledged: usize,
    pub rejected: usize,
    pub ignored: usize,
    pub malformed: usize,
}

impl ReplaySummary {
    pub fn handled(&self) -> usize {
        self.acknowledged + self.rejected + self.ignored
    }
}

/// An orchestrator wired to an in-memory ledger and role directory.
///
/// Every user seen in an event is treated as a member of the community.
pub struct Gatekeeper {
    orchestrator: WorkflowOrchestrator,
    ledger: Arc<InMemoryLedger>,
    directory: Arc<InMemoryRoleDirectory>,
    community: CommunityId,
}

impl Gatekeeper {
    pub fn build(config: &GatekeeperConfig, transport: Arc<dyn ChatTransport>) -> DaemonResult<Self> {
        let settings = config.workflow_settings();
        let community = settings.community;

        let ledger = Arc::new(InMemoryLedger::with_header(LEDGER_HEADER));
        let directory = Arc::new(InMemoryRoleDirectory::new());
        for holder in &config.community.role_holders {
            directory.seed_grant(community, UserId::new(*holder), &settings.role_name);
        }

        let writer = LedgerWriter::new(ledger.clone(), config.ledger.clone(), config.call_timeout())?;
        let roles = RoleGrantService::new(directory.clone(), config.call_timeout());
        let orchestrator =
            WorkflowOrchestrator::with_direct_messages(settings, writer, roles, transport);

        info!(
            community = %community,
            role_holders = config.community.role_holders.len(),
            "Gatekeeper ready"
        );

        Ok(Self {
            orchestrator,
            ledger,
            directory,
            community,
        })
    }

    pub async fn replay<R>(&self, reader: R) -> DaemonResult<ReplaySummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = ReplaySummary::default();
        let mut lines = reader.lines();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event: InboundEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(err) => {
                    warn!(line = line_no, error = %err, "Skipping malformed event");
                    summary.malformed += 1;
                    continue;
                }
            };

            self.directory.add_member(self.community, event.user());
            let report = self.orchestrator.handle(event).await;
            debug!(line = line_no, flow = %report.flow_id, states = ?report.states, "Event handled");

            match report.outcome {
                FlowOutcome::Acknowledged(_) => summary.acknowledged += 1,
                FlowOutcome::Rejected(_) => summary.rejected += 1,
                FlowOutcome::Ignored => summary.ignored += 1,
            }
        }

        Ok(summary)
    }

    pub fn orchestrator(&self) -> &WorkflowOrchestrator {
        &self.orchestrator
    }

    /// Rows in the ledger, header included.
    pub fn ledger_rows(&self) -> usize {
        self.ledger.len()
    }

    pub fn orphaned_rows(&self) -> Vec<OrphanedRow> {
        self.orchestrator.orphaned_rows()
    }

    /// Hand recorded delivery failures to the caller and forget them.
    pub fn drain_delivery_failures(&self) -> Vec<DeliveryFailure> {
        self.orchestrator.journal().drain_delivery_failures()
    }
}
