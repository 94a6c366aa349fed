//! End-to-end flows against in-memory collaborators.

use gatekeeper_ledger::{InMemoryLedger, LedgerLayout, LedgerWriter};
use gatekeeper_roles::{InMemoryRoleDirectory, RoleGrantService};
use gatekeeper_types::{
    field, CellValue, CommunityId, FormFields, FormKind, MessageRef, UserId, ValidationError,
};
use gatekeeper_workflow::{
    messages, Acknowledgement, FlowError, FlowState, InboundEvent, IncomingMessage, Outbound,
    RecordingTransport, WorkflowOrchestrator, WorkflowSettings,
};
use std::sync::Arc;
use std::time::Duration;

const COMMUNITY: CommunityId = CommunityId(7);
const OWNER: UserId = UserId(900);
const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);
const ROLE: &str = "Registered Creator";

struct Harness {
    orchestrator: WorkflowOrchestrator,
    ledger: Arc<InMemoryLedger>,
    directory: Arc<InMemoryRoleDirectory>,
    transport: Arc<RecordingTransport>,
}

/// A ledger with a header and two verified rows, so the next free row is 4.
fn harness() -> Harness {
    let ledger = Arc::new(InMemoryLedger::with_header(["Username", "User ID", "Count", "Score"]));
    ledger.push_literal_row(["Carol", "301"]);
    ledger.push_literal_row(["Dave", "302"]);

    let directory = Arc::new(InMemoryRoleDirectory::new());
    for id in 1..=20 {
        directory.add_member(COMMUNITY, UserId::new(id));
    }

    let transport = Arc::new(RecordingTransport::new());
    let settings = WorkflowSettings::new(COMMUNITY, OWNER);
    let writer = LedgerWriter::new(ledger.clone(), LedgerLayout::default(), Duration::from_secs(2))
        .unwrap();
    let roles = RoleGrantService::new(directory.clone(), Duration::from_secs(2));
    let orchestrator =
        WorkflowOrchestrator::with_direct_messages(settings, writer, roles, transport.clone());

    Harness {
        orchestrator,
        ledger,
        directory,
        transport,
    }
}

fn verify_form(username: &str, user_id: &str, phrase: &str) -> FormFields {
    FormFields::new()
        .with(field::USERNAME, username)
        .with(field::USER_ID, user_id)
        .with(field::PORTFOLIO, "")
        .with(field::ACKNOWLEDGMENT, phrase)
}

fn post_form() -> FormFields {
    FormFields::new()
        .with(field::TITLE, "Castle")
        .with(field::DESCRIPTION, "A small keep")
}

fn publish_form() -> FormFields {
    FormFields::new()
        .with(field::ITEM_NAME, "Lantern")
        .with(field::DESCRIPTION, "Hangs from ceilings")
        .with(field::MODEL_FILE, "https://files.example/lantern.obj")
        .with(field::TEXTURE_FILE, "https://files.example/lantern.png")
}

fn ephemeral(user: UserId, text: impl Into<String>) -> Outbound {
    Outbound::Ephemeral {
        user,
        text: text.into(),
    }
}

// ── verify ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_verify_writes_row_and_grants_role() {
    let h = harness();

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "i agree"), ALICE)
        .await;

    assert!(report.is_acknowledged(), "{:?}", report.outcome);
    assert_eq!(
        report.states,
        vec![
            FlowState::Received,
            FlowState::Validated,
            FlowState::LedgerWritten,
            FlowState::RoleGranted,
            FlowState::Acknowledged,
        ]
    );

    assert_eq!(h.ledger.cell(4, "A"), Some(CellValue::Literal("Alice".into())));
    assert_eq!(h.ledger.cell(4, "B"), Some(CellValue::Literal("123".into())));
    assert_eq!(
        h.ledger.cell(4, "C"),
        Some(CellValue::Formula("=COUNTA(E4:Z4)".into()))
    );
    assert_eq!(
        h.ledger.cell(4, "D"),
        Some(CellValue::Formula("=(C4/SUM($C$2:$C$1000))*70".into()))
    );

    assert_eq!(h.directory.role_count(COMMUNITY), 1);
    assert_eq!(h.directory.member_roles(COMMUNITY, ALICE).len(), 1);
    assert_eq!(
        h.transport.acknowledgements_to(ALICE),
        vec![ephemeral(ALICE, messages::verified(ROLE))]
    );
    assert_eq!(h.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_verify_reuses_existing_role() {
    let h = harness();
    h.directory.seed_role(COMMUNITY, ROLE);

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
        .await;

    assert!(report.is_acknowledged());
    assert_eq!(h.directory.calls().create_role, 0);
    assert_eq!(h.directory.role_count(COMMUNITY), 1);
}

#[tokio::test]
async fn test_already_verified_user_never_touches_ledger() {
    let h = harness();
    h.directory.seed_grant(COMMUNITY, BOB, ROLE);

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Bob", "456", "I Agree"), BOB)
        .await;

    assert_eq!(
        report.acknowledgement(),
        Some(&Acknowledgement::Text(messages::ALREADY_VERIFIED.to_string()))
    );
    assert!(!report.visited(FlowState::LedgerWritten));
    assert_eq!(h.ledger.calls().total(), 0);
    assert_eq!(h.directory.calls().mutations(), 0);
    assert_eq!(h.ledger.len(), 3);
}

#[tokio::test]
async fn test_verify_command_skips_form_for_verified_user() {
    let h = harness();
    h.directory.seed_grant(COMMUNITY, BOB, ROLE);

    let report = h.orchestrator.on_slash_command("verify", BOB).await;

    assert_eq!(
        h.transport.acknowledgements_to(BOB),
        vec![ephemeral(BOB, messages::ALREADY_VERIFIED)]
    );
    assert!(report.is_acknowledged());
}

#[tokio::test]
async fn test_verify_command_shows_form() {
    let h = harness();

    let report = h.orchestrator.on_slash_command("/verify", ALICE).await;

    assert_eq!(
        report.acknowledgement(),
        Some(&Acknowledgement::FormShown(FormKind::Verify))
    );
    assert_eq!(
        h.transport.acknowledgements_to(ALICE),
        vec![Outbound::Form {
            user: ALICE,
            form: FormKind::Verify
        }]
    );
}

#[tokio::test]
async fn test_wrong_phrase_rejected_without_side_effects() {
    let h = harness();

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "yes"), ALICE)
        .await;

    assert_eq!(
        report.error(),
        Some(&FlowError::Validation(
            ValidationError::AcknowledgmentRequired {
                phrase: "I Agree".into()
            }
        ))
    );
    assert_eq!(report.final_state(), FlowState::Rejected);
    assert_eq!(h.ledger.calls().total(), 0);
    assert_eq!(h.directory.calls(), Default::default());

    let acks = h.transport.acknowledgements_to(ALICE);
    assert_eq!(acks.len(), 1);
    assert!(matches!(&acks[0], Outbound::Ephemeral { text, .. } if text.contains("I Agree")));
}

#[tokio::test]
async fn test_missing_username_rejected_without_side_effects() {
    let h = harness();

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("  ", "123", "I Agree"), ALICE)
        .await;

    assert_eq!(
        report.error(),
        Some(&FlowError::Validation(ValidationError::MissingField(
            field::USERNAME
        )))
    );
    assert_eq!(h.ledger.calls().total(), 0);
}

#[tokio::test]
async fn test_unreachable_ledger_stops_before_role_grant() {
    let h = harness();
    h.ledger.set_unreachable(true);

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
        .await;

    assert_eq!(report.error().map(FlowError::code), Some("ledger_write"));
    assert_eq!(h.directory.calls().mutations(), 0);
    assert!(h.directory.member_roles(COMMUNITY, ALICE).is_empty());
    assert_eq!(h.transport.acknowledgements_to(ALICE).len(), 1);
}

#[tokio::test]
async fn test_failed_grant_keeps_row_and_journals_it() {
    let h = harness();
    h.directory.set_fail_add_role(true);

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
        .await;

    assert_eq!(report.error().map(FlowError::code), Some("role_service"));
    assert!(report.visited(FlowState::LedgerWritten));
    assert!(!report.visited(FlowState::RoleGranted));
    assert_eq!(h.ledger.cell(4, "A"), Some(CellValue::Literal("Alice".into())));

    let orphans = h.orchestrator.orphaned_rows();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].user, ALICE);
    assert_eq!(orphans[0].row.row, 4);

    let acks = h.transport.acknowledgements_to(ALICE);
    assert_eq!(acks.len(), 1);
    assert!(matches!(&acks[0], Outbound::Ephemeral { text, .. } if text.contains("recorded")));
}

#[tokio::test]
async fn test_incomplete_append_is_journaled_and_retry_reuses_row() {
    let h = harness();
    h.ledger.simulate_foreign_append();

    let first = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
        .await;

    assert_eq!(first.error().map(FlowError::code), Some("ledger_write"));
    assert_eq!(h.ledger.cell(4, "A"), Some(CellValue::Literal("Alice".into())));
    assert!(h.directory.member_roles(COMMUNITY, ALICE).is_empty());

    let orphans = h.orchestrator.orphaned_rows();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].row.row, 4);

    let acks = h.transport.acknowledgements_to(ALICE);
    assert_eq!(acks.len(), 1);
    assert!(matches!(&acks[0], Outbound::Ephemeral { text, .. } if text.contains("saved")));

    let retry = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
        .await;

    assert!(retry.is_acknowledged(), "{:?}", retry.outcome);
    assert_eq!(h.ledger.calls().insert_row, 1);
    let alice_rows: Vec<u32> = (2..=h.ledger.len() as u32)
        .filter(|row| h.ledger.cell(*row, "A") == Some(CellValue::Literal("Alice".into())))
        .collect();
    assert_eq!(alice_rows, vec![4]);
    assert!(h.orchestrator.orphaned_rows().is_empty());
    assert_eq!(h.directory.member_roles(COMMUNITY, ALICE).len(), 1);
}

#[tokio::test]
async fn test_retry_after_failed_grant_reuses_row() {
    let h = harness();
    h.directory.set_fail_add_role(true);
    h.orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
        .await;
    assert_eq!(h.orchestrator.orphaned_rows().len(), 1);

    h.directory.set_fail_add_role(false);
    let retry = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
        .await;

    assert!(retry.visited(FlowState::RoleGranted));
    assert_eq!(h.ledger.len(), 4);
    assert_eq!(h.ledger.calls().insert_row, 1);
    assert!(h.orchestrator.orphaned_rows().is_empty());
}

#[tokio::test]
async fn test_non_member_gets_row_but_no_role() {
    let h = harness();
    let stranger = UserId::new(5_000);

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Verify, verify_form("Eve", "777", "I Agree"), stranger)
        .await;

    assert!(matches!(
        report.error(),
        Some(FlowError::RoleService(
            gatekeeper_roles::RoleServiceError::MemberNotFound(user)
        )) if *user == stranger
    ));
    assert_eq!(h.orchestrator.orphaned_rows().len(), 1);
    assert_eq!(h.ledger.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verifications_get_distinct_rows() {
    let h = Arc::new(harness());

    let mut handles = Vec::new();
    for id in 1..=8u64 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.orchestrator
                .on_form_submitted(
                    FormKind::Verify,
                    verify_form(&format!("user{}", id), &id.to_string(), "I Agree"),
                    UserId::new(id),
                )
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_acknowledged());
    }

    assert_eq!(h.ledger.len(), 3 + 8);
    let mut names: Vec<String> = (4..=11)
        .filter_map(|row| match h.ledger.cell(row, "A") {
            Some(CellValue::Literal(name)) => Some(name),
            _ => None,
        })
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 8);
    assert_eq!(h.directory.role_count(COMMUNITY), 1);
    for id in 1..=8 {
        assert_eq!(h.directory.member_roles(COMMUNITY, UserId::new(id)).len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_submit_by_same_user_writes_once() {
    let h = Arc::new(harness());

    let first = {
        let h = Arc::clone(&h);
        tokio::spawn(async move {
            h.orchestrator
                .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
                .await
        })
    };
    let second = {
        let h = Arc::clone(&h);
        tokio::spawn(async move {
            h.orchestrator
                .on_form_submitted(FormKind::Verify, verify_form("Alice", "123", "I Agree"), ALICE)
                .await
        })
    };
    let reports = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(h.ledger.len(), 4);
    assert_eq!(
        reports
            .iter()
            .filter(|r| r.visited(FlowState::LedgerWritten))
            .count(),
        1
    );
    assert!(reports.iter().any(|r| r.acknowledgement()
        == Some(&Acknowledgement::Text(messages::ALREADY_VERIFIED.to_string()))));
}

// ── publish ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_publish_command_requires_role() {
    let h = harness();

    let report = h.orchestrator.on_slash_command("publish", ALICE).await;

    assert_eq!(
        report.error(),
        Some(&FlowError::NotAuthorized { role: ROLE.into() })
    );
    let acks = h.transport.acknowledgements_to(ALICE);
    assert_eq!(acks.len(), 1);
    assert!(matches!(acks[0], Outbound::Ephemeral { .. }));
}

#[tokio::test]
async fn test_publish_form_requires_role() {
    let h = harness();

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Publish, publish_form(), ALICE)
        .await;

    assert_eq!(report.error().map(FlowError::code), Some("not_authorized"));
    assert!(h.transport.direct_messages_to(OWNER).is_empty());
    assert!(h.orchestrator.submissions().is_empty());
}

#[tokio::test]
async fn test_publish_notifies_owner_once() {
    let h = harness();
    h.directory.seed_grant(COMMUNITY, BOB, ROLE);

    let shown = h.orchestrator.on_slash_command("publish", BOB).await;
    assert_eq!(
        shown.acknowledgement(),
        Some(&Acknowledgement::FormShown(FormKind::Publish))
    );

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Publish, publish_form(), BOB)
        .await;

    assert!(report.visited(FlowState::Notified));
    let notices = h.transport.direct_messages_to(OWNER);
    assert_eq!(notices.len(), 1);
    let notice = &notices[0];
    assert!(notice.headline.contains(&BOB.mention()));
    assert_eq!(notice.field("Item name"), Some("Lantern"));
    assert_eq!(notice.field("Description"), Some("Hangs from ceilings"));
    assert_eq!(
        notice.field("Model file"),
        Some("https://files.example/lantern.obj")
    );
    assert_eq!(
        notice.field("Texture file"),
        Some("https://files.example/lantern.png")
    );
    assert_eq!(
        h.transport.acknowledgements_to(BOB).last(),
        Some(&ephemeral(BOB, messages::PUBLISH_ACCEPTED))
    );
}

#[tokio::test]
async fn test_publish_survives_unreachable_owner() {
    let h = harness();
    h.directory.seed_grant(COMMUNITY, BOB, ROLE);
    h.transport.set_fail_direct(true);

    let report = h
        .orchestrator
        .on_form_submitted(FormKind::Publish, publish_form(), BOB)
        .await;

    assert!(report.is_acknowledged());
    assert!(!report.visited(FlowState::Notified));
    assert_eq!(h.orchestrator.delivery_failures().len(), 1);
    assert_eq!(
        h.transport.acknowledgements_to(BOB),
        vec![ephemeral(BOB, messages::PUBLISH_ACCEPTED)]
    );
}

// ── post ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_post_flow_delivers_with_attachment() {
    let h = harness();
    let message = MessageRef::new(10, 11);

    let shown = h.orchestrator.on_slash_command("post", ALICE).await;
    assert_eq!(
        shown.acknowledgement(),
        Some(&Acknowledgement::FormShown(FormKind::Post))
    );

    let stored = h
        .orchestrator
        .on_form_submitted(FormKind::Post, post_form(), ALICE)
        .await;
    assert_eq!(stored.final_state(), FlowState::Acknowledged);
    assert!(stored.visited(FlowState::Stored));
    assert!(h.orchestrator.submissions().contains(ALICE));

    let delivered = h
        .orchestrator
        .on_message(
            IncomingMessage::new(message, ALICE, "here it is")
                .with_attachment("https://cdn.example/castle.png")
                .with_attachment("https://cdn.example/second.png"),
        )
        .await;

    assert!(delivered.visited(FlowState::Notified));
    assert!(!h.orchestrator.submissions().contains(ALICE));

    let notices = h.transport.direct_messages_to(OWNER);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Castle");
    assert_eq!(notices[0].description, "A small keep");
    assert_eq!(
        notices[0].image_url.as_deref(),
        Some("https://cdn.example/castle.png")
    );
    assert_eq!(
        h.transport.replies_to(message),
        vec![messages::POST_DELIVERED.to_string()]
    );
}

#[tokio::test]
async fn test_post_without_attachment_has_no_image() {
    let h = harness();
    h.orchestrator
        .on_form_submitted(FormKind::Post, post_form(), ALICE)
        .await;

    h.orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 2), ALICE, "no image"))
        .await;

    let notices = h.transport.direct_messages_to(OWNER);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].image_url.is_none());
}

#[tokio::test]
async fn test_second_message_is_ignored() {
    let h = harness();
    h.orchestrator
        .on_form_submitted(FormKind::Post, post_form(), ALICE)
        .await;
    h.orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 2), ALICE, "first"))
        .await;
    let sent = h.transport.sent().len();

    let report = h
        .orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 3), ALICE, "second"))
        .await;

    assert_eq!(report.outcome, gatekeeper_workflow::FlowOutcome::Ignored);
    assert_eq!(h.transport.sent().len(), sent);
    assert_eq!(h.transport.direct_messages_to(OWNER).len(), 1);
}

#[tokio::test]
async fn test_message_without_pending_post_is_ignored() {
    let h = harness();

    let report = h
        .orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 2), ALICE, "hello"))
        .await;

    assert_eq!(report.outcome, gatekeeper_workflow::FlowOutcome::Ignored);
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_bot_message_does_not_consume_pending_post() {
    let h = harness();
    h.orchestrator
        .on_form_submitted(FormKind::Post, post_form(), ALICE)
        .await;
    h.transport.clear();

    let report = h
        .orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 2), ALICE, "echo").from_bot())
        .await;

    assert_eq!(report.outcome, gatekeeper_workflow::FlowOutcome::Ignored);
    assert!(h.orchestrator.submissions().contains(ALICE));
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_other_users_message_does_not_consume_post() {
    let h = harness();
    h.orchestrator
        .on_form_submitted(FormKind::Post, post_form(), ALICE)
        .await;

    h.orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 2), BOB, "hi"))
        .await;

    assert!(h.orchestrator.submissions().contains(ALICE));
    assert!(h.transport.direct_messages_to(OWNER).is_empty());
}

#[tokio::test]
async fn test_pending_publish_is_not_consumed_by_message() {
    let h = harness();
    h.directory.seed_grant(COMMUNITY, BOB, ROLE);
    h.orchestrator
        .on_form_submitted(FormKind::Publish, publish_form(), BOB)
        .await;

    let report = h
        .orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 2), BOB, "image"))
        .await;

    assert_eq!(report.outcome, gatekeeper_workflow::FlowOutcome::Ignored);
    assert_eq!(h.transport.direct_messages_to(OWNER).len(), 1);
}

#[tokio::test]
async fn test_failed_post_delivery_keeps_submission_for_retry() {
    let h = harness();
    h.orchestrator
        .on_form_submitted(FormKind::Post, post_form(), ALICE)
        .await;
    h.transport.set_fail_direct(true);
    let message = MessageRef::new(1, 2);

    let report = h
        .orchestrator
        .on_message(IncomingMessage::new(message, ALICE, "image"))
        .await;

    assert_eq!(report.error().map(FlowError::code), Some("notification"));
    assert!(h.orchestrator.submissions().contains(ALICE));
    assert_eq!(h.orchestrator.delivery_failures().len(), 1);
    assert_eq!(h.transport.replies_to(message).len(), 1);

    h.transport.set_fail_direct(false);
    let retry = h
        .orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 3), ALICE, "again"))
        .await;
    assert!(retry.is_acknowledged());
    assert_eq!(h.transport.direct_messages_to(OWNER).len(), 1);
}

#[tokio::test]
async fn test_newer_post_replaces_older() {
    let h = harness();
    h.orchestrator
        .on_form_submitted(FormKind::Post, post_form(), ALICE)
        .await;
    h.orchestrator
        .on_form_submitted(
            FormKind::Post,
            FormFields::new()
                .with(field::TITLE, "Tower")
                .with(field::DESCRIPTION, "Taller"),
            ALICE,
        )
        .await;

    h.orchestrator
        .on_message(IncomingMessage::new(MessageRef::new(1, 2), ALICE, "img"))
        .await;

    let notices = h.transport.direct_messages_to(OWNER);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Tower");
}

#[tokio::test]
async fn test_overlong_title_rejected() {
    let h = harness();

    let report = h
        .orchestrator
        .on_form_submitted(
            FormKind::Post,
            FormFields::new()
                .with(field::TITLE, "x".repeat(101))
                .with(field::DESCRIPTION, "fine"),
            ALICE,
        )
        .await;

    assert_eq!(report.error().map(FlowError::code), Some("validation"));
    assert!(h.orchestrator.submissions().is_empty());
}

// ── commands ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_command_cooldown() {
    let h = harness();

    assert!(h.orchestrator.on_slash_command("post", ALICE).await.is_acknowledged());
    let again = h.orchestrator.on_slash_command("post", ALICE).await;
    assert_eq!(again.error().map(FlowError::code), Some("cooldown"));

    // Other users and other commands are unaffected.
    assert!(h.orchestrator.on_slash_command("post", BOB).await.is_acknowledged());
    assert!(h.orchestrator.on_slash_command("verify", ALICE).await.is_acknowledged());

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(h.orchestrator.on_slash_command("post", ALICE).await.is_acknowledged());
}

#[tokio::test(start_paused = true)]
async fn test_expired_cooldowns_are_swept() {
    let h = harness();

    for id in 1..=100 {
        h.orchestrator.on_slash_command("post", UserId::new(id)).await;
    }
    assert_eq!(h.orchestrator.cooldowns().tracked(), 100);

    tokio::time::advance(Duration::from_secs(6)).await;
    for id in 101..=128 {
        h.orchestrator.on_slash_command("post", UserId::new(id)).await;
    }

    // The sweep on the 128th command dropped every entry older than the window.
    assert_eq!(h.orchestrator.cooldowns().tracked(), 28);
}

#[tokio::test]
async fn test_unknown_command() {
    let h = harness();

    let report = h.orchestrator.on_slash_command("dance", ALICE).await;

    assert_eq!(
        report.error(),
        Some(&FlowError::Validation(ValidationError::UnknownCommand(
            "dance".into()
        )))
    );
    assert_eq!(h.transport.acknowledgements_to(ALICE).len(), 1);
}

#[tokio::test]
async fn test_handle_dispatches_events() {
    let h = harness();

    let report = h
        .orchestrator
        .handle(InboundEvent::SlashCommand {
            name: "post".into(),
            user: ALICE,
        })
        .await;
    assert_eq!(
        report.acknowledgement(),
        Some(&Acknowledgement::FormShown(FormKind::Post))
    );

    let report = h
        .orchestrator
        .handle(InboundEvent::FormSubmitted {
            form: FormKind::Post,
            user: ALICE,
            fields: post_form(),
        })
        .await;
    assert!(report.visited(FlowState::Stored));

    let report = h
        .orchestrator
        .handle(InboundEvent::Message(IncomingMessage::new(
            MessageRef::new(3, 4),
            ALICE,
            "img",
        )))
        .await;
    assert!(report.visited(FlowState::Notified));
}

#[tokio::test]
async fn test_every_flow_sends_exactly_one_acknowledgement() {
    let h = harness();
    h.directory.seed_grant(COMMUNITY, BOB, ROLE);

    let cases: Vec<(UserId, InboundEvent)> = vec![
        (
            UserId::new(3),
            InboundEvent::SlashCommand {
                name: "publish".into(),
                user: UserId::new(3),
            },
        ),
        (
            UserId::new(4),
            InboundEvent::FormSubmitted {
                form: FormKind::Verify,
                user: UserId::new(4),
                fields: verify_form("X", "1", "nope"),
            },
        ),
        (
            UserId::new(5),
            InboundEvent::FormSubmitted {
                form: FormKind::Verify,
                user: UserId::new(5),
                fields: verify_form("Y", "2", "I Agree"),
            },
        ),
        (
            BOB,
            InboundEvent::FormSubmitted {
                form: FormKind::Publish,
                user: BOB,
                fields: publish_form(),
            },
        ),
        (
            UserId::new(6),
            InboundEvent::FormSubmitted {
                form: FormKind::Post,
                user: UserId::new(6),
                fields: FormFields::new(),
            },
        ),
    ];

    for (user, event) in cases {
        h.orchestrator.handle(event).await;
        assert_eq!(h.transport.acknowledgements_to(user).len(), 1, "user {}", user);
        h.transport.clear();
    }
}
