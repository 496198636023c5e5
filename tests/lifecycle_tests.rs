//! End-to-end lifecycle coverage over the in-memory gateway: distribution
//! scenarios, claim/release authority, cancellation, the owner approval
//! track, follow-up requests, and invoice collaboration.

mod common;

use std::sync::atomic::Ordering;

use common::{create_command, TestWorld};
use steward_core::distribution::DistributionType;
use steward_core::error::EngineError;
use steward_core::models::Actor;
use steward_core::orchestration::{ApprovalDecision, ChildRequestCommand, EditRequestCommand};
use steward_core::state_machine::{OwnerApprovalStatus, RequestStatus};

const OWNER: Actor = Actor {
    role: steward_core::models::ActorRole::Owner,
    id: 5,
};

#[tokio::test]
async fn create_without_preferred_vendors_opens_the_pool() {
    // Scenario A
    let world = TestWorld::new();
    let outcome = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();

    let request = world.request(outcome.request.id);
    assert_eq!(request.status, RequestStatus::NotYetAssigned);
    assert_eq!(
        request.distribution_type,
        DistributionType::DistributeToAllVendors
    );
    assert!(world.claim_vendor_ids(request.id).is_empty());
    assert!(request.vendor_id.is_none());
}

#[tokio::test]
async fn create_with_preferred_vendors_offers_them() {
    // Scenario B
    let world = TestWorld::with_preferred(vec![3, 9]);
    let outcome = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();

    let request = world.request(outcome.request.id);
    assert_eq!(request.status, RequestStatus::Claimed);
    assert_eq!(request.distribution_type, DistributionType::PreferredVendor);
    assert_eq!(world.claim_vendor_ids(request.id), vec![3, 9]);
    assert!(request.vendor_id.is_none(), "no vendor until a claim lands");
}

#[tokio::test]
async fn claim_fixes_vendor_and_clears_sibling_rows() {
    // Scenario C
    let world = TestWorld::with_preferred(vec![3, 9]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();

    let outcome = world
        .orchestrator
        .claim(Actor::vendor(3), created.request.id)
        .await
        .unwrap();

    assert_eq!(outcome.request.status, RequestStatus::Scheduled);
    assert_eq!(outcome.request.vendor_id, Some(3));
    assert!(world.claim_vendor_ids(created.request.id).is_empty());
}

#[tokio::test]
async fn selected_vendor_claim_by_outsider_is_denied() {
    let world = TestWorld::new();
    let mut command = create_command();
    command.explicit_vendor_ids = vec![7];
    let created = world
        .orchestrator
        .create_request(OWNER, command)
        .await
        .unwrap();
    assert_eq!(
        world.request(created.request.id).distribution_type,
        DistributionType::SelectedVendor
    );

    let err = world
        .orchestrator
        .claim(Actor::vendor(8), created.request.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));

    // The chosen vendor still can
    let outcome = world
        .orchestrator
        .claim(Actor::vendor(7), created.request.id)
        .await
        .unwrap();
    assert_eq!(outcome.request.vendor_id, Some(7));
}

#[tokio::test]
async fn release_by_unrelated_vendor_is_denied() {
    // Scenario E
    let world = TestWorld::with_preferred(vec![3, 9]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    world
        .orchestrator
        .claim(Actor::vendor(3), created.request.id)
        .await
        .unwrap();

    let err = world
        .orchestrator
        .release_vendor(Actor::vendor(9), created.request.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));

    // Stored state is untouched
    let request = world.request(created.request.id);
    assert_eq!(request.status, RequestStatus::Scheduled);
    assert_eq!(request.vendor_id, Some(3));
}

#[tokio::test]
async fn release_returns_request_to_pool_and_resets_invoice() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    world.orchestrator.claim(Actor::vendor(3), id).await.unwrap();

    let outcome = world
        .orchestrator
        .release_vendor(Actor::vendor(3), id)
        .await
        .unwrap();

    assert_eq!(outcome.request.status, RequestStatus::NotYetAssigned);
    assert!(outcome.request.vendor_id.is_none());
    assert!(outcome.request.invoice_id.is_none());
    assert_eq!(
        outcome.request.distribution_type,
        DistributionType::DistributeToAllVendors,
        "a released request re-enters the open pool"
    );
    assert_eq!(world.invoicing.reset_calls.lock().len(), 1);

    // Any qualified vendor may now pick it up
    let reclaimed = world
        .orchestrator
        .claim(Actor::vendor(42), id)
        .await
        .unwrap();
    assert_eq!(reclaimed.request.vendor_id, Some(42));
}

#[tokio::test]
async fn illegal_transitions_leave_stored_status_unchanged() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;

    // Claimed request cannot start work or complete
    for result in [
        world.orchestrator.start_work(Actor::admin(1), id).await,
        world.orchestrator.complete(Actor::admin(1), id).await,
        world.orchestrator.record_deposit_paid(Actor::admin(1), id).await,
    ] {
        assert!(matches!(result.unwrap_err(), EngineError::StateConflict(_)));
    }
    assert_eq!(world.request(id).status, RequestStatus::Claimed);
}

#[tokio::test]
async fn owners_never_progress_status_directly() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    world.orchestrator.claim(Actor::vendor(3), id).await.unwrap();

    let err = world.orchestrator.start_work(OWNER, id).await.unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));
    assert_eq!(world.request(id).status, RequestStatus::Scheduled);
}

#[tokio::test]
async fn full_happy_path_through_completion() -> anyhow::Result<()> {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await?;
    let id = created.request.id;
    let vendor = Actor::vendor(3);

    world.orchestrator.claim(vendor, id).await?;
    world.orchestrator.start_work(vendor, id).await?;
    let outcome = world.orchestrator.complete(vendor, id).await?;

    assert_eq!(outcome.request.status, RequestStatus::CompletedSuccessfully);
    assert_eq!(outcome.request.vendor_id, Some(3));
    assert!(outcome.request.invoice_id.is_some(), "completion invoices");

    // Terminal: nothing moves it anymore
    let err = world
        .orchestrator
        .cancel(OWNER, id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    Ok(())
}

#[tokio::test]
async fn deposit_gate_requires_external_signal() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    let vendor = Actor::vendor(3);

    world.orchestrator.claim(vendor, id).await.unwrap();
    world.orchestrator.start_work(vendor, id).await.unwrap();
    let gated = world
        .orchestrator
        .require_deposit(vendor, id)
        .await
        .unwrap();
    assert_eq!(gated.request.status, RequestStatus::DepositRequired);
    assert!(gated.request.invoice_id.is_some());
    assert_eq!(gated.request.vendor_id, Some(3), "vendor rides the gate");

    // The vendor cannot lift the gate themselves
    let err = world
        .orchestrator
        .record_deposit_paid(vendor, id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));

    let resumed = world
        .orchestrator
        .record_deposit_paid(Actor::system(), id)
        .await
        .unwrap();
    assert_eq!(resumed.request.status, RequestStatus::InProgress);
}

#[tokio::test]
async fn required_invoice_failure_rolls_the_use_case_back() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    let vendor = Actor::vendor(3);
    world.orchestrator.claim(vendor, id).await.unwrap();
    world.orchestrator.start_work(vendor, id).await.unwrap();

    world.invoicing.fail.store(true, Ordering::SeqCst);
    let err = world.orchestrator.complete(vendor, id).await.unwrap_err();
    assert!(matches!(err, EngineError::Dependency(_)));

    let request = world.request(id);
    assert_eq!(request.status, RequestStatus::InProgress);
    assert!(request.invoice_id.is_none());
}

#[tokio::test]
async fn cancel_records_audit_metadata() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    world.orchestrator.claim(Actor::vendor(3), id).await.unwrap();

    let outcome = world
        .orchestrator
        .cancel(OWNER, id, Some("owner sold the property".to_string()))
        .await
        .unwrap();

    let cancellation = outcome.request.cancellation.expect("metadata recorded");
    assert_eq!(cancellation.cancelled_by, OWNER);
    assert_eq!(cancellation.at_status, RequestStatus::Scheduled);
    assert_eq!(
        cancellation.reason.as_deref(),
        Some("owner sold the property")
    );
    assert!(outcome.request.vendor_id.is_none());
    assert_eq!(outcome.request.status, RequestStatus::Cancelled);
}

#[tokio::test]
async fn vendors_cannot_cancel() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();

    let err = world
        .orchestrator
        .cancel(Actor::vendor(3), created.request.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));
}

#[tokio::test]
async fn guest_requests_gate_claims_on_owner_approval() {
    let world = TestWorld::with_preferred(vec![3]);
    let mut command = create_command();
    command.is_guest = true;
    let created = world
        .orchestrator
        .create_request(OWNER, command)
        .await
        .unwrap();
    let id = created.request.id;
    assert_eq!(
        created.request.owner_approval,
        OwnerApprovalStatus::UnApproved
    );

    let err = world
        .orchestrator
        .claim(Actor::vendor(3), id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    world
        .orchestrator
        .resolve_owner_approval(OWNER, id, ApprovalDecision::Approve)
        .await
        .unwrap();
    let outcome = world.orchestrator.claim(Actor::vendor(3), id).await.unwrap();
    assert_eq!(outcome.request.status, RequestStatus::Scheduled);
}

#[tokio::test]
async fn approval_resolves_exactly_once() {
    let world = TestWorld::with_preferred(vec![3]);
    let mut command = create_command();
    command.is_guest = true;
    let created = world
        .orchestrator
        .create_request(OWNER, command)
        .await
        .unwrap();
    let id = created.request.id;

    world
        .orchestrator
        .resolve_owner_approval(OWNER, id, ApprovalDecision::Approve)
        .await
        .unwrap();
    let err = world
        .orchestrator
        .resolve_owner_approval(OWNER, id, ApprovalDecision::Reject)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn rejection_forces_terminal_rejected() {
    let world = TestWorld::with_preferred(vec![3]);
    let mut command = create_command();
    command.is_guest = true;
    let created = world
        .orchestrator
        .create_request(OWNER, command)
        .await
        .unwrap();
    let id = created.request.id;

    let outcome = world
        .orchestrator
        .resolve_owner_approval(OWNER, id, ApprovalDecision::Reject)
        .await
        .unwrap();
    assert_eq!(outcome.request.status, RequestStatus::Rejected);
    assert_eq!(
        outcome.request.owner_approval,
        OwnerApprovalStatus::Rejected
    );
    assert!(world.claim_vendor_ids(id).is_empty());
}

#[tokio::test]
async fn approval_is_owner_only() {
    let world = TestWorld::with_preferred(vec![3]);
    let mut command = create_command();
    command.is_guest = true;
    let created = world
        .orchestrator
        .create_request(OWNER, command)
        .await
        .unwrap();

    let err = world
        .orchestrator
        .resolve_owner_approval(Actor::admin(1), created.request.id, ApprovalDecision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));
}

async fn partially_completed_request(world: &TestWorld, vendor: Actor) -> i64 {
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    world.orchestrator.claim(vendor, id).await.unwrap();
    world.orchestrator.start_work(vendor, id).await.unwrap();
    world
        .orchestrator
        .complete_partially(vendor, id)
        .await
        .unwrap();
    id
}

fn child_command(parent_id: i64) -> ChildRequestCommand {
    let start = common::monday_9am() + chrono::Duration::days(7);
    ChildRequestCommand {
        parent_id,
        priority: steward_core::models::Priority::High,
        description: Some("touch up the grout".to_string()),
        scheduled_start: start,
        scheduled_end: start + chrono::Duration::hours(1),
        media: Vec::new(),
        note_text: None,
    }
}

#[tokio::test]
async fn child_requests_require_partial_completion_and_are_unique_per_actor() {
    let world = TestWorld::with_preferred(vec![3]);
    let vendor = Actor::vendor(3);
    let parent_id = partially_completed_request(&world, vendor).await;

    let child = world
        .orchestrator
        .create_child_request(vendor, child_command(parent_id))
        .await
        .unwrap();
    assert_eq!(child.request.parent_id, Some(parent_id));
    assert!(child.request.is_discrepancy);
    assert_eq!(
        child.request.owner_approval,
        OwnerApprovalStatus::UnApproved
    );

    // Same actor cannot file a second follow-up
    let err = world
        .orchestrator
        .create_child_request(vendor, child_command(parent_id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    // A different eligible actor can
    world
        .orchestrator
        .create_child_request(OWNER, child_command(parent_id))
        .await
        .unwrap();
}

#[tokio::test]
async fn child_requests_reject_bad_parents() {
    let world = TestWorld::with_preferred(vec![3]);
    let vendor = Actor::vendor(3);

    // Parent not partially completed
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let err = world
        .orchestrator
        .create_child_request(vendor, child_command(created.request.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    // Unrelated vendor may not file follow-ups
    let parent_id = partially_completed_request(&world, vendor).await;
    let err = world
        .orchestrator
        .create_child_request(Actor::vendor(99), child_command(parent_id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));

    // Missing parent
    let err = world
        .orchestrator
        .create_child_request(vendor, child_command(424242))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn edit_to_selected_vendor_replaces_claim_rows() {
    let world = TestWorld::with_preferred(vec![3, 9]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    assert_eq!(world.claim_vendor_ids(id), vec![3, 9]);

    let outcome = world
        .orchestrator
        .edit_request(
            OWNER,
            EditRequestCommand {
                request_id: id,
                explicit_vendor_ids: Some(vec![7]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.request.distribution_type,
        DistributionType::SelectedVendor
    );
    assert_eq!(outcome.request.status, RequestStatus::Claimed);
    assert_eq!(world.claim_vendor_ids(id), vec![7]);

    // Only the new candidate is notified
    let offer = outcome
        .intents
        .iter()
        .find(|intent| {
            intent.action == steward_core::events::NotificationAction::CandidatesOffered
        })
        .expect("offer intent");
    assert_eq!(offer.parameters["vendor_ids"], serde_json::json!([7]));
}

#[tokio::test]
async fn distribution_edits_are_confined_to_the_claim_window() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    world.orchestrator.claim(Actor::vendor(3), id).await.unwrap();

    let err = world
        .orchestrator
        .edit_request(
            OWNER,
            EditRequestCommand {
                request_id: id,
                explicit_vendor_ids: Some(vec![7]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    // Benign edits still apply
    let outcome = world
        .orchestrator
        .edit_request(
            OWNER,
            EditRequestCommand {
                request_id: id,
                priority: Some(steward_core::models::Priority::Urgent),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        outcome.request.priority,
        steward_core::models::Priority::Urgent
    );
}

#[tokio::test]
async fn every_transition_writes_exactly_one_note() {
    let world = TestWorld::with_preferred(vec![3]);
    let created = world
        .orchestrator
        .create_request(OWNER, create_command())
        .await
        .unwrap();
    let id = created.request.id;
    let vendor = Actor::vendor(3);
    world.orchestrator.claim(vendor, id).await.unwrap();
    world.orchestrator.start_work(vendor, id).await.unwrap();
    world.orchestrator.complete(vendor, id).await.unwrap();

    let notes = world.gateway.note_snapshot(id);
    assert_eq!(notes.len(), 4, "creation plus three transitions");
    assert_eq!(notes[0].status_before, None);
    assert_eq!(notes[1].status_before, Some(RequestStatus::Claimed));
    assert_eq!(notes[1].status_after, RequestStatus::Scheduled);
    assert_eq!(notes[3].status_after, RequestStatus::CompletedSuccessfully);
}

#[tokio::test]
async fn note_text_edit_is_author_or_admin_only() {
    let world = TestWorld::with_preferred(vec![3]);
    let mut command = create_command();
    command.note_text = Some("please use the side entrance".to_string());
    let created = world
        .orchestrator
        .create_request(OWNER, command)
        .await
        .unwrap();
    let note = world
        .gateway
        .note_snapshot(created.request.id)
        .into_iter()
        .next()
        .unwrap();

    let err = world
        .orchestrator
        .edit_note_text(Actor::vendor(3), note.id, "reworded".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));

    let updated = world
        .orchestrator
        .edit_note_text(OWNER, note.id, "use the back entrance".to_string())
        .await
        .unwrap();
    assert_eq!(updated.text.as_deref(), Some("use the back entrance"));
}
