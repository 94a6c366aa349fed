//! Workflow orchestrator: the entry point for every inbound event
//!
//! Each event is handled under its user's lock, walked through the flow
//! state machine, and closed with exactly one acknowledgement. The
//! orchestrator owns the pending-submission store and the cooldown
//! tracker; the ledger, role system, transport and reviewer are
//! collaborators it only calls through bounded, timed-out requests.

use crate::error::{FlowError, FlowResult, NotificationError};
use crate::events::{InboundEvent, IncomingMessage};
use crate::journal::{AnomalyJournal, DeliveryFailure, OrphanedRow};
use crate::locks::UserLocks;
use crate::messages;
use crate::notify::{DirectMessageSink, NotificationSink};
use crate::settings::{command, WorkflowSettings};
use crate::state::{
    Acknowledgement, FlowOutcome, FlowReport, FlowState, FlowTrace, FlowTrigger,
};
use crate::transport::{ChatTransport, TransportError};
use gatekeeper_ledger::LedgerWriter;
use gatekeeper_roles::{GrantOutcome, RoleGrantService, RoleServiceError};
use gatekeeper_store::{CooldownTracker, SubmissionStore};
use gatekeeper_types::{
    FormFields, FormKind, MessageRef, Notice, PostSubmission, PublishSubmission, SubmissionKind,
    UserId, ValidationError, VerificationRecord,
};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Expired cooldown entries are swept once per this many slash commands.
const COOLDOWN_PURGE_EVERY: u64 = 128;

/// Where the acknowledgement of a flow goes.
#[derive(Clone, Copy, Debug)]
enum AckChannel {
    Ephemeral(UserId),
    Thread(MessageRef),
}

/// Drives post, publish and verify flows.
pub struct WorkflowOrchestrator {
    settings: WorkflowSettings,
    submissions: SubmissionStore,
    cooldowns: CooldownTracker,
    commands_seen: AtomicU64,
    ledger: LedgerWriter,
    roles: RoleGrantService,
    transport: Arc<dyn ChatTransport>,
    reviewer: Arc<dyn NotificationSink>,
    user_locks: UserLocks,
    journal: AnomalyJournal,
}

impl WorkflowOrchestrator {
    pub fn new(
        settings: WorkflowSettings,
        ledger: LedgerWriter,
        roles: RoleGrantService,
        transport: Arc<dyn ChatTransport>,
        reviewer: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            cooldowns: CooldownTracker::new(settings.command_cooldown),
            settings,
            submissions: SubmissionStore::new(),
            commands_seen: AtomicU64::new(0),
            ledger,
            roles,
            transport,
            reviewer,
            user_locks: UserLocks::new(),
            journal: AnomalyJournal::new(),
        }
    }

    /// Deliver reviewer notices as direct messages over `transport`.
    pub fn with_direct_messages(
        settings: WorkflowSettings,
        ledger: LedgerWriter,
        roles: RoleGrantService,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let reviewer = Arc::new(DirectMessageSink::new(
            Arc::clone(&transport),
            settings.reviewer,
        ));
        Self::new(settings, ledger, roles, transport, reviewer)
    }

    // ── Inbound events ───────────────────────────────────────────────

    pub async fn handle(&self, event: InboundEvent) -> FlowReport {
        match event {
            InboundEvent::SlashCommand { name, user } => self.on_slash_command(&name, user).await,
            InboundEvent::FormSubmitted { form, user, fields } => {
                self.on_form_submitted(form, fields, user).await
            }
            InboundEvent::Message(message) => self.on_message(message).await,
        }
    }

    /// A slash command. Success shows a form or, for `verify` by a
    /// verified user, says so.
    pub async fn on_slash_command(&self, name: &str, user: UserId) -> FlowReport {
        let span = info_span!("command", command = name, user = %user);
        async {
            self.sweep_cooldowns();
            let guard = self.user_locks.acquire(user).await;
            let trace = FlowTrace::start(
                user,
                FlowTrigger::Command {
                    name: name.to_string(),
                },
            );
            let result = self.run_command(name, user).await.map(Some);
            let report = self
                .conclude(trace, result, AckChannel::Ephemeral(user))
                .await;
            self.user_locks.release(user, guard);
            report
        }
        .instrument(span)
        .await
    }

    /// A submitted form.
    pub async fn on_form_submitted(
        &self,
        form: FormKind,
        fields: FormFields,
        user: UserId,
    ) -> FlowReport {
        let span = info_span!("form", form = %form, user = %user);
        async {
            let guard = self.user_locks.acquire(user).await;
            let mut trace = FlowTrace::start(user, FlowTrigger::Form { form });
            let result = match form {
                FormKind::Post => self.run_post_form(&mut trace, &fields, user),
                FormKind::Publish => self.run_publish_form(&mut trace, &fields, user).await,
                FormKind::Verify => self.run_verify_form(&mut trace, &fields, user).await,
            }
            .map(Some);
            let report = self
                .conclude(trace, result, AckChannel::Ephemeral(user))
                .await;
            self.user_locks.release(user, guard);
            report
        }
        .instrument(span)
        .await
    }

    /// A channel message. Only the author's next message after a post form
    /// continues a flow; everything else is ignored.
    pub async fn on_message(&self, message: IncomingMessage) -> FlowReport {
        let user = message.author;
        if message.author_is_bot {
            return FlowTrace::start(user, FlowTrigger::Message).finish(FlowOutcome::Ignored);
        }

        let span = info_span!("message", user = %user, message = %message.message_ref);
        async {
            let guard = self.user_locks.acquire(user).await;
            let mut trace = FlowTrace::start(user, FlowTrigger::Message);
            let result = self.run_message(&mut trace, &message).await;
            let report = self
                .conclude(trace, result, AckChannel::Thread(message.message_ref))
                .await;
            self.user_locks.release(user, guard);
            report
        }
        .instrument(span)
        .await
    }

    // ── Flows ────────────────────────────────────────────────────────

    async fn run_command(&self, name: &str, user: UserId) -> FlowResult<Acknowledgement> {
        let name = name.trim().trim_start_matches('/').to_ascii_lowercase();
        let form = match name.as_str() {
            command::POST => FormKind::Post,
            command::PUBLISH => FormKind::Publish,
            command::VERIFY => FormKind::Verify,
            _ => return Err(ValidationError::UnknownCommand(name.clone()).into()),
        };

        self.cooldowns.try_acquire(user, &name)?;

        match form {
            FormKind::Post => {}
            FormKind::Publish => self.require_role(user).await?,
            FormKind::Verify => {
                if self.holds_role(user).await? {
                    return Ok(Acknowledgement::Text(messages::ALREADY_VERIFIED.to_string()));
                }
            }
        }
        Ok(Acknowledgement::FormShown(form))
    }

    fn run_post_form(
        &self,
        trace: &mut FlowTrace,
        fields: &FormFields,
        user: UserId,
    ) -> FlowResult<Acknowledgement> {
        let post = PostSubmission::from_fields(fields, &self.settings.limits)?;
        trace.advance(FlowState::Validated);

        if let Some(previous) = self.submissions.put(user, post) {
            debug!(replaced = %previous.kind(), "Earlier pending submission discarded");
        }
        trace.advance(FlowState::Stored);

        Ok(Acknowledgement::Text(messages::POST_STORED.to_string()))
    }

    async fn run_publish_form(
        &self,
        trace: &mut FlowTrace,
        fields: &FormFields,
        user: UserId,
    ) -> FlowResult<Acknowledgement> {
        self.require_role(user).await?;

        let item = PublishSubmission::from_fields(fields, &self.settings.limits)?;
        trace.advance(FlowState::Validated);

        let notice = messages::publish_notice(user, &item);
        self.submissions.put(user, item);
        trace.advance(FlowState::Stored);

        // Acceptance stands even when the reviewer cannot be reached.
        match self.notify_reviewer(&notice).await {
            Ok(()) => trace.advance(FlowState::Notified),
            Err(err) => {
                self.journal
                    .record_delivery_failure(user, SubmissionKind::Publish, err.to_string())
            }
        }

        Ok(Acknowledgement::Text(messages::PUBLISH_ACCEPTED.to_string()))
    }

    async fn run_verify_form(
        &self,
        trace: &mut FlowTrace,
        fields: &FormFields,
        user: UserId,
    ) -> FlowResult<Acknowledgement> {
        let record = VerificationRecord::from_fields(
            fields,
            &self.settings.confirmation_phrase,
            &self.settings.limits,
        )?;
        trace.advance(FlowState::Validated);

        if self.holds_role(user).await? {
            info!("User already verified; ledger untouched");
            self.journal.resolve_orphaned_row(user);
            return Ok(Acknowledgement::Text(messages::ALREADY_VERIFIED.to_string()));
        }

        // A row left by an earlier failed attempt is reused, never appended twice.
        let row = match self.journal.orphaned_row_for(user) {
            Some(orphan) => {
                info!(row = orphan.row.row, "Reusing ledger row from an earlier attempt");
                orphan.row
            }
            None => match self.ledger.append_verification(&record).await {
                Ok(row) => row,
                Err(err) => {
                    if let Some(row) = err.committed_row() {
                        self.journal
                            .record_orphaned_row(user, row.clone(), err.to_string());
                    }
                    return Err(err.into());
                }
            },
        };
        trace.advance(FlowState::LedgerWritten);

        // The ledger row is not rolled back if the grant fails.
        if let Err(err) = self.grant_role(user).await {
            self.journal.record_orphaned_row(user, row, err.to_string());
            return Err(err);
        }
        self.journal.resolve_orphaned_row(user);
        trace.advance(FlowState::RoleGranted);

        info!(row = row.row, role = %self.settings.role_name, "User verified");
        Ok(Acknowledgement::Text(messages::verified(
            &self.settings.role_name,
        )))
    }

    async fn run_message(
        &self,
        trace: &mut FlowTrace,
        message: &IncomingMessage,
    ) -> FlowResult<Option<Acknowledgement>> {
        let user = message.author;
        let Some(post) = self.submissions.take_pending_post(user) else {
            return Ok(None);
        };

        let notice = messages::post_notice(user, &post, message.first_attachment());
        if let Err(err) = self.notify_reviewer(&notice).await {
            // Delivery is the whole point of this flow, so it fails, and the
            // user may try again with another message.
            self.journal
                .record_delivery_failure(user, SubmissionKind::Simple, err.to_string());
            self.submissions.restore(user, post);
            return Err(err.into());
        }
        trace.advance(FlowState::Notified);

        Ok(Some(Acknowledgement::Text(
            messages::POST_DELIVERED.to_string(),
        )))
    }

    // ── Collaborator calls ───────────────────────────────────────────

    async fn holds_role(&self, user: UserId) -> FlowResult<bool> {
        Ok(self
            .roles
            .holds_role(self.settings.community, user, &self.settings.role_name)
            .await?)
    }

    async fn require_role(&self, user: UserId) -> FlowResult<()> {
        if self.holds_role(user).await? {
            Ok(())
        } else {
            Err(FlowError::NotAuthorized {
                role: self.settings.role_name.clone(),
            })
        }
    }

    async fn grant_role(&self, user: UserId) -> FlowResult<()> {
        let role = self
            .roles
            .ensure_role(self.settings.community, &self.settings.role_name)
            .await?;
        match self.roles.grant(&role, user).await? {
            GrantOutcome::Granted => Ok(()),
            GrantOutcome::AlreadyGranted => {
                debug!(role = %role.name, "Role already held at grant time");
                Ok(())
            }
            GrantOutcome::Failed(reason) => Err(RoleServiceError::GrantFailed(reason).into()),
        }
    }

    async fn notify_reviewer(&self, notice: &Notice) -> Result<(), NotificationError> {
        bounded(self.settings.external_call_timeout, self.reviewer.deliver(notice))
            .await
            .map_err(|err| match err {
                Bounded::Timeout => NotificationError::Timeout(self.settings.external_call_timeout),
                Bounded::Failed(err) => NotificationError::Transport(err),
            })
    }

    // ── Acknowledgement ──────────────────────────────────────────────

    async fn conclude(
        &self,
        mut trace: FlowTrace,
        result: FlowResult<Option<Acknowledgement>>,
        channel: AckChannel,
    ) -> FlowReport {
        match result {
            Ok(None) => trace.finish(FlowOutcome::Ignored),
            Ok(Some(ack)) => {
                self.send_acknowledgement(channel, &ack).await;
                trace.advance(FlowState::Acknowledged);
                info!(flow = %trace.flow_id().short(), "Flow acknowledged");
                trace.finish(FlowOutcome::Acknowledged(ack))
            }
            Err(err) => {
                warn!(
                    flow = %trace.flow_id().short(),
                    code = err.code(),
                    error = %err,
                    from = ?trace.current(),
                    "Flow rejected"
                );
                let recorded = trace.visited(FlowState::LedgerWritten);
                self.send_acknowledgement(
                    channel,
                    &Acknowledgement::Text(err.user_message_with(recorded)),
                )
                .await;
                trace.advance(FlowState::Rejected);
                trace.finish(FlowOutcome::Rejected(err))
            }
        }
    }

    async fn send_acknowledgement(&self, channel: AckChannel, ack: &Acknowledgement) {
        let timeout = self.settings.external_call_timeout;
        let result = match (channel, ack) {
            (AckChannel::Ephemeral(user), Acknowledgement::FormShown(form)) => {
                bounded(timeout, self.transport.present_form(user, *form)).await
            }
            (AckChannel::Ephemeral(user), Acknowledgement::Text(text)) => {
                bounded(timeout, self.transport.reply_ephemeral(user, text)).await
            }
            (AckChannel::Thread(message), Acknowledgement::Text(text)) => {
                bounded(timeout, self.transport.reply(message, text)).await
            }
            (AckChannel::Thread(message), Acknowledgement::FormShown(form)) => {
                warn!(message = %message, form = %form, "Cannot show a form in a thread reply");
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "Acknowledgement could not be delivered");
        }
    }

    // ── Query ────────────────────────────────────────────────────────

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn submissions(&self) -> &SubmissionStore {
        &self.submissions
    }

    pub fn orphaned_rows(&self) -> Vec<OrphanedRow> {
        self.journal.orphaned_rows()
    }

    pub fn delivery_failures(&self) -> Vec<DeliveryFailure> {
        self.journal.delivery_failures()
    }

    pub fn journal(&self) -> &AnomalyJournal {
        &self.journal
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    fn sweep_cooldowns(&self) {
        let seen = self.commands_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % COOLDOWN_PURGE_EVERY == 0 {
            let purged = self.cooldowns.purge_expired();
            debug!(purged, remaining = self.cooldowns.tracked(), "Cooldowns swept");
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum Bounded {
    #[error("timed out")]
    Timeout,
    #[error(transparent)]
    Failed(#[from] TransportError),
}

async fn bounded(
    timeout: std::time::Duration,
    call: impl Future<Output = Result<(), TransportError>>,
) -> Result<(), Bounded> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(Bounded::from),
        Err(_) => Err(Bounded::Timeout),
    }
}
