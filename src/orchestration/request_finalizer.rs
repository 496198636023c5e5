//! # Request Finalizer
//!
//! Status progression for assigned work (start, deposit gate, completion),
//! cancellation, owner approval resolution, and the note text edit. Invoicing
//! is consulted inside the unit of work for the transitions that mandate it,
//! so a collaborator failure rolls the whole use case back.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::distribution::DistributionType;
use crate::error::{EngineError, EngineResult};
use crate::events::{NotificationAction, NotificationIntent};
use crate::gateway::invoicing::{InvoiceCollaborator, InvoiceTrigger};
use crate::gateway::persistence::PersistenceGateway;
use crate::gateway::vendors::VendorDirectory;
use crate::models::{Actor, ActorRole, Cancellation, NewRequestNote, RequestNote};
use crate::state_machine::states::{OwnerApprovalStatus, RequestStatus};
use crate::state_machine::{guards, plan_transition, RequestEvent};

use super::occurrence_materializer::OccurrenceMaterializer;
use super::redistribution::{apply_claim_rows, offer_intent, resolve_plan};
use super::types::{load_request, ApprovalDecision, RequestOutcome};

/// Terminal and progression use cases
pub struct RequestFinalizer {
    gateway: Arc<dyn PersistenceGateway>,
    vendors: Arc<dyn VendorDirectory>,
    invoicing: Arc<dyn InvoiceCollaborator>,
    materializer: OccurrenceMaterializer,
}

impl RequestFinalizer {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        vendors: Arc<dyn VendorDirectory>,
        invoicing: Arc<dyn InvoiceCollaborator>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            gateway,
            vendors,
            invoicing,
            materializer: OccurrenceMaterializer::new(config.recurrence.horizon_days),
        }
    }

    /// The assigned vendor begins work.
    pub async fn start_work(&self, actor: Actor, request_id: i64) -> EngineResult<RequestOutcome> {
        self.progress(
            actor,
            request_id,
            RequestEvent::StartWork,
            None,
            NotificationAction::WorkStarted,
        )
        .await
    }

    /// Gate further work on a deposit payment.
    pub async fn require_deposit(
        &self,
        actor: Actor,
        request_id: i64,
    ) -> EngineResult<RequestOutcome> {
        self.progress(
            actor,
            request_id,
            RequestEvent::RequireDeposit,
            Some(InvoiceTrigger::DepositRequired),
            NotificationAction::DepositRequested,
        )
        .await
    }

    /// External deposit-paid signal resumes the gated work. Never automatic:
    /// the transport layer calls this when the payment collaborator confirms.
    pub async fn record_deposit_paid(
        &self,
        actor: Actor,
        request_id: i64,
    ) -> EngineResult<RequestOutcome> {
        self.progress(
            actor,
            request_id,
            RequestEvent::DepositPaid,
            None,
            NotificationAction::DepositPaid,
        )
        .await
    }

    /// Work ended successfully.
    pub async fn complete(&self, actor: Actor, request_id: i64) -> EngineResult<RequestOutcome> {
        self.progress(
            actor,
            request_id,
            RequestEvent::Complete,
            Some(InvoiceTrigger::CompletedSuccessfully),
            NotificationAction::RequestCompleted,
        )
        .await
    }

    /// Work ended with open items; follow-ups may now be created.
    pub async fn complete_partially(
        &self,
        actor: Actor,
        request_id: i64,
    ) -> EngineResult<RequestOutcome> {
        self.progress(
            actor,
            request_id,
            RequestEvent::CompletePartially,
            Some(InvoiceTrigger::PartiallyCompleted),
            NotificationAction::RequestPartiallyCompleted,
        )
        .await
    }

    #[instrument(skip(self, event, action), fields(event = event.event_type()))]
    async fn progress(
        &self,
        actor: Actor,
        request_id: i64,
        event: RequestEvent,
        invoice_trigger: Option<InvoiceTrigger>,
        action: NotificationAction,
    ) -> EngineResult<RequestOutcome> {
        let mut uow = self.gateway.begin().await?;
        let mut stored = load_request(uow.as_mut(), request_id).await?;

        let planned = plan_transition(stored.request.status, actor.role, &event)?;
        guards::ensure_assigned_vendor(&actor, &stored.request)?;

        stored.request.status = planned.to;
        if let Some(trigger) = invoice_trigger {
            // Required collaborator: a failure here rolls the use case back
            if let Some(invoice_id) = self
                .invoicing
                .invoice_for(&stored.request, trigger)
                .await?
            {
                stored.request.invoice_id = Some(invoice_id);
            }
        }

        uow.update_request(&stored).await?;
        uow.insert_note(NewRequestNote::transition(
            request_id,
            planned.from,
            planned.to,
            actor,
        ))
        .await?;

        let intents = vec![NotificationIntent::new(
            action,
            json!({
                "service_request_id": request_id,
                "owner_id": stored.request.owner_id,
                "vendor_id": stored.request.vendor_id,
                "status": stored.request.status,
            }),
        )];

        uow.commit().await?;

        info!(
            service_request_id = request_id,
            from = %planned.from,
            to = %planned.to,
            "request progressed"
        );
        Ok(RequestOutcome {
            request: stored.request,
            generated_ids: Vec::new(),
            intents,
        })
    }

    /// Cancel a request; irreversible, records who cancelled and from where.
    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        actor: Actor,
        request_id: i64,
        reason: Option<String>,
    ) -> EngineResult<RequestOutcome> {
        let mut uow = self.gateway.begin().await?;
        let mut stored = load_request(uow.as_mut(), request_id).await?;

        guards::ensure_owner_or_admin(&actor, &stored.request)?;
        let planned = plan_transition(stored.request.status, actor.role, &RequestEvent::Cancel)?;

        stored.request.cancellation = Some(Cancellation {
            cancelled_by: actor,
            at_status: planned.from,
            cancelled_at: Utc::now(),
            reason,
        });
        stored.request.vendor_id = None;
        stored.request.status = planned.to;
        uow.update_request(&stored).await?;
        uow.delete_claim_rows(request_id).await?;

        // A cancelled template takes its pending occurrences with it
        if stored.request.is_recurring {
            self.materializer
                .remove_unclaimed(uow.as_mut(), request_id, true)
                .await?;
            uow.delete_schedule(request_id).await?;
        }

        uow.insert_note(NewRequestNote::transition(
            request_id,
            planned.from,
            planned.to,
            actor,
        ))
        .await?;

        let intents = vec![NotificationIntent::new(
            NotificationAction::RequestCancelled,
            json!({
                "service_request_id": request_id,
                "owner_id": stored.request.owner_id,
                "cancelled_at_status": planned.from,
            }),
        )];

        uow.commit().await?;

        info!(
            service_request_id = request_id,
            at_status = %planned.from,
            "request cancelled"
        );
        Ok(RequestOutcome {
            request: stored.request,
            generated_ids: Vec::new(),
            intents,
        })
    }

    /// Owner resolution of the approval track, exactly once.
    #[instrument(skip(self))]
    pub async fn resolve_approval(
        &self,
        actor: Actor,
        request_id: i64,
        decision: ApprovalDecision,
    ) -> EngineResult<RequestOutcome> {
        let mut uow = self.gateway.begin().await?;
        let mut stored = load_request(uow.as_mut(), request_id).await?;

        guards::ensure_approval_actor(&actor, &stored.request)?;
        if !stored.request.requires_owner_approval() {
            return Err(EngineError::validation(format!(
                "service request {request_id} has no approval track"
            )));
        }
        if stored.request.owner_approval.is_resolved() {
            return Err(EngineError::state_conflict(format!(
                "approval for service request {request_id} was already resolved to {}",
                stored.request.owner_approval
            )));
        }

        let mut intents = Vec::new();
        let status_before = stored.request.status;

        match decision {
            ApprovalDecision::Reject => {
                let planned =
                    plan_transition(stored.request.status, actor.role, &RequestEvent::OwnerReject)?;
                stored.request.owner_approval = OwnerApprovalStatus::Rejected;
                stored.request.vendor_id = None;
                stored.request.status = planned.to;
                uow.update_request(&stored).await?;
                uow.delete_claim_rows(request_id).await?;
                uow.insert_note(NewRequestNote::transition(
                    request_id,
                    planned.from,
                    planned.to,
                    actor,
                ))
                .await?;
            }
            ApprovalDecision::Approve => {
                stored.request.owner_approval = OwnerApprovalStatus::Approved;

                // Approval re-runs distribution while the claim window is open
                if stored.request.status.is_claim_window() {
                    let rows = uow.claim_rows(request_id).await?;
                    // Explicit strategies keep their chosen set; preferred and
                    // open-pool strategies re-consult the directory
                    let explicit: Vec<i64> = match stored.request.distribution_type {
                        DistributionType::SelectedVendor | DistributionType::MultipleVendors => {
                            rows.iter().map(|row| row.vendor_id).collect()
                        }
                        _ => Vec::new(),
                    };
                    let plan = resolve_plan(
                        self.vendors.as_ref(),
                        &explicit,
                        stored.request.property_id,
                        stored.request.service_type_id,
                        stored.request.franchise_id,
                    )
                    .await?;

                    if stored.request.status != plan.initial_status {
                        let event = if plan.initial_status == RequestStatus::Claimed {
                            RequestEvent::OfferToCandidates
                        } else {
                            RequestEvent::ReturnToPool
                        };
                        let planned =
                            plan_transition(stored.request.status, ActorRole::System, &event)?;
                        stored.request.status = planned.to;
                    }
                    stored.request.distribution_type = plan.distribution_type;
                    apply_claim_rows(uow.as_mut(), request_id, &plan).await?;

                    if let Some(offer) =
                        offer_intent(self.vendors.as_ref(), &stored.request, &[], &plan.candidates)
                            .await?
                    {
                        intents.push(offer);
                    }
                }

                uow.update_request(&stored).await?;
                if stored.request.status != status_before {
                    uow.insert_note(NewRequestNote::transition(
                        request_id,
                        status_before,
                        stored.request.status,
                        actor,
                    ))
                    .await?;
                }
            }
        }

        intents.push(NotificationIntent::new(
            NotificationAction::ApprovalResolved,
            json!({
                "service_request_id": request_id,
                "owner_id": stored.request.owner_id,
                "decision": stored.request.owner_approval,
            }),
        ));

        uow.commit().await?;

        info!(
            service_request_id = request_id,
            decision = %stored.request.owner_approval,
            "approval resolved"
        );
        Ok(RequestOutcome {
            request: stored.request,
            generated_ids: Vec::new(),
            intents,
        })
    }

    /// The one mutation notes ever see: their author (or an admin) rewording
    /// the text. Status fields and media are immutable.
    #[instrument(skip(self, text))]
    pub async fn edit_note_text(
        &self,
        actor: Actor,
        note_id: i64,
        text: String,
    ) -> EngineResult<RequestNote> {
        let mut uow = self.gateway.begin().await?;
        let mut note = uow
            .find_note(note_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("note {note_id}")))?;

        if note.author != actor && !actor.is_admin() {
            return Err(EngineError::authorization(format!(
                "actor {actor} may not edit note {note_id}"
            )));
        }

        uow.update_note_text(note_id, &text).await?;
        uow.commit().await?;

        note.text = Some(text);
        Ok(note)
    }
}
