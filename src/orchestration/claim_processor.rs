//! # Claim Processor
//!
//! The race-sensitive path: vendors accepting and walking away from requests.
//! A claim either holds a live claim row or qualifies for the open pool; the
//! winning write fixes `vendor_id`, deletes the sibling rows, and moves the
//! request to Scheduled. Concurrent claims are serialized by the unit of
//! work's version guard — exactly one commits, the rest observe StateConflict.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::distribution::DistributionType;
use crate::error::{EngineError, EngineResult};
use crate::events::{NotificationAction, NotificationIntent};
use crate::gateway::invoicing::InvoiceCollaborator;
use crate::gateway::persistence::PersistenceGateway;
use crate::gateway::vendors::VendorDirectory;
use crate::models::{Actor, NewRequestNote};
use crate::state_machine::states::OwnerApprovalStatus;
use crate::state_machine::{guards, plan_transition, RequestEvent};

use super::types::{load_request, RequestOutcome};

/// Vendor claim and release use cases
pub struct ClaimProcessor {
    gateway: Arc<dyn PersistenceGateway>,
    vendors: Arc<dyn VendorDirectory>,
    invoicing: Arc<dyn InvoiceCollaborator>,
}

impl ClaimProcessor {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        vendors: Arc<dyn VendorDirectory>,
        invoicing: Arc<dyn InvoiceCollaborator>,
    ) -> Self {
        Self {
            gateway,
            vendors,
            invoicing,
        }
    }

    /// A vendor accepts a request.
    #[instrument(skip(self), fields(vendor_id = actor.id))]
    pub async fn claim(&self, actor: Actor, request_id: i64) -> EngineResult<RequestOutcome> {
        let mut uow = self.gateway.begin().await?;
        let mut stored = load_request(uow.as_mut(), request_id).await?;
        let request = &stored.request;

        let planned = plan_transition(
            request.status,
            actor.role,
            &RequestEvent::Claim {
                vendor_id: actor.id,
            },
        )?;

        if request.requires_owner_approval()
            && request.owner_approval != OwnerApprovalStatus::Approved
        {
            return Err(EngineError::state_conflict(format!(
                "service request {request_id} is awaiting owner approval"
            )));
        }

        let rows = uow.claim_rows(request_id).await?;
        let qualified = if request.distribution_type.is_open_pool() {
            self.vendors
                .is_qualified(actor.id, request.service_type_id, request.franchise_id)
                .await?
        } else {
            false
        };
        guards::ensure_claim_rights(&actor, request, &rows, qualified)?;

        stored.request.vendor_id = Some(actor.id);
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

        let intents = vec![NotificationIntent::new(
            NotificationAction::RequestClaimed,
            json!({
                "service_request_id": request_id,
                "vendor_id": actor.id,
                "owner_id": stored.request.owner_id,
            }),
        )];

        // The version guard makes this the single winning write; concurrent
        // claimants fail here with StateConflict.
        uow.commit().await?;

        info!(
            service_request_id = request_id,
            vendor_id = actor.id,
            "request claimed"
        );
        Ok(RequestOutcome {
            request: stored.request,
            generated_ids: Vec::new(),
            intents,
        })
    }

    /// The assigned vendor (or an admin) releases a request back to the pool.
    #[instrument(skip(self))]
    pub async fn release(&self, actor: Actor, request_id: i64) -> EngineResult<RequestOutcome> {
        let mut uow = self.gateway.begin().await?;
        let mut stored = load_request(uow.as_mut(), request_id).await?;

        let planned = plan_transition(stored.request.status, actor.role, &RequestEvent::Release)?;
        guards::ensure_assigned_vendor(&actor, &stored.request)?;

        let released_vendor = stored.request.vendor_id;
        self.invoicing
            .reset_linkage(request_id, stored.request.invoice_id)
            .await?;

        stored.request.vendor_id = None;
        stored.request.invoice_id = None;
        stored.request.status = planned.to;
        // NotYetAssigned with zero rows is the open pool; leaving the old
        // strategy in place would strand the request with no claimable path
        stored.request.distribution_type = DistributionType::DistributeToAllVendors;
        uow.update_request(&stored).await?;
        uow.delete_claim_rows(request_id).await?;
        uow.insert_note(NewRequestNote::transition(
            request_id,
            planned.from,
            planned.to,
            actor,
        ))
        .await?;

        let intents = vec![NotificationIntent::new(
            NotificationAction::VendorReleased,
            json!({
                "service_request_id": request_id,
                "vendor_id": released_vendor,
                "owner_id": stored.request.owner_id,
            }),
        )];

        uow.commit().await?;

        info!(
            service_request_id = request_id,
            vendor_id = ?released_vendor,
            "vendor released"
        );
        Ok(RequestOutcome {
            request: stored.request,
            generated_ids: Vec::new(),
            intents,
        })
    }
}
