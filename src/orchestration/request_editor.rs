//! # Request Editor
//!
//! Single-transaction edits of a live request. Benign field changes apply in
//! any non-terminal state; anything that touches distribution (explicit vendor
//! choice, service type) is confined to the claim window and atomically
//! replaces the claim rows, notifying only the vendors who were not already
//! offered the request. Recurrence parameter changes prune still-unclaimed
//! generated siblings and re-materialize under the new rule.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{NotificationAction, NotificationIntent};
use crate::gateway::catalog::{CatalogRef, CatalogValidator};
use crate::gateway::persistence::PersistenceGateway;
use crate::gateway::vendors::VendorDirectory;
use crate::models::{Actor, ActorRole, NewRequestNote, RecurringSchedule};
use crate::recurrence;
use crate::state_machine::states::RequestStatus;
use crate::state_machine::{guards, plan_transition, RequestEvent};

use super::occurrence_materializer::OccurrenceMaterializer;
use super::redistribution::{apply_claim_rows, offer_intent, resolve_plan};
use super::types::{
    load_request, validate_window, EditRequestCommand, RecurrenceChange, RequestOutcome,
};

/// Atomic service request edits
pub struct RequestEditor {
    gateway: Arc<dyn PersistenceGateway>,
    catalog: Arc<dyn CatalogValidator>,
    vendors: Arc<dyn VendorDirectory>,
    materializer: OccurrenceMaterializer,
}

impl RequestEditor {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        catalog: Arc<dyn CatalogValidator>,
        vendors: Arc<dyn VendorDirectory>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            gateway,
            catalog,
            vendors,
            materializer: OccurrenceMaterializer::new(config.recurrence.horizon_days),
        }
    }

    #[instrument(skip(self, command), fields(request_id = command.request_id))]
    pub async fn edit(
        &self,
        actor: Actor,
        command: EditRequestCommand,
    ) -> EngineResult<RequestOutcome> {
        let mut uow = self.gateway.begin().await?;
        let mut stored = load_request(uow.as_mut(), command.request_id).await?;
        let request_id = command.request_id;

        guards::ensure_owner_or_admin(&actor, &stored.request)?;
        if stored.request.status.is_terminal() {
            return Err(EngineError::state_conflict(format!(
                "service request {request_id} is {} and can no longer be edited",
                stored.request.status
            )));
        }

        let service_type_changed = command
            .service_type_id
            .is_some_and(|id| id != stored.request.service_type_id);
        let redistributes = service_type_changed || command.explicit_vendor_ids.is_some();
        if redistributes && !stored.request.status.is_claim_window() {
            return Err(EngineError::state_conflict(format!(
                "service request {request_id} is {}; distribution changes require the claim window",
                stored.request.status
            )));
        }

        // Benign field changes
        if let Some(priority) = command.priority {
            stored.request.priority = priority;
        }
        if let Some(description) = &command.description {
            stored.request.description = Some(description.clone());
        }
        if let Some(service_type_id) = command.service_type_id {
            stored.request.service_type_id = service_type_id;
        }
        if let Some(start) = command.scheduled_start {
            stored.request.scheduled_start = start;
        }
        if let Some(end) = command.scheduled_end {
            stored.request.scheduled_end = end;
        }
        if let Some(turn_over) = command.is_turn_over {
            stored.request.is_turn_over = turn_over;
        }
        if let Some(linen_detail) = &command.linen_detail {
            stored.request.linen_detail = Some(linen_detail.clone());
        }
        validate_window(stored.request.scheduled_start, stored.request.scheduled_end)?;

        // Re-validate eligibility against the (possibly new) coordinates
        let catalog_ref = CatalogRef {
            franchise_id: stored.request.franchise_id,
            property_id: stored.request.property_id,
            service_type_id: stored.request.service_type_id,
        };
        self.catalog
            .eligibility(&catalog_ref)
            .await?
            .ensure_for(&catalog_ref, stored.request.is_guest)?;

        let mut intents = Vec::new();
        let status_before = stored.request.status;
        let mut candidates: Vec<i64> = uow
            .claim_rows(request_id)
            .await?
            .iter()
            .map(|row| row.vendor_id)
            .collect();

        if redistributes {
            let explicit = command.explicit_vendor_ids.clone().unwrap_or_default();
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
                let planned = plan_transition(stored.request.status, ActorRole::System, &event)?;
                stored.request.status = planned.to;
            }
            stored.request.distribution_type = plan.distribution_type;
            apply_claim_rows(uow.as_mut(), request_id, &plan).await?;

            if let Some(offer) = offer_intent(
                self.vendors.as_ref(),
                &stored.request,
                &candidates,
                &plan.candidates,
            )
            .await?
            {
                intents.push(offer);
            }
            candidates = plan.candidates;
        }

        let mut generated_ids = Vec::new();
        match &command.recurrence {
            Some(RecurrenceChange::Set(rule)) => {
                recurrence::validate_rule(
                    stored.request.scheduled_start.date_naive(),
                    rule,
                    self.materializer.horizon_days(),
                )?;
                let pruned = self
                    .materializer
                    .remove_unclaimed(uow.as_mut(), request_id, false)
                    .await?;
                uow.put_schedule(&RecurringSchedule::from_rule(request_id, rule))
                    .await?;
                stored.request.is_recurring = true;

                let kept: HashSet<_> = pruned.kept_dates.iter().copied().collect();
                generated_ids = self
                    .materializer
                    .materialize(uow.as_mut(), &stored.request, rule, &candidates, &kept)
                    .await?;
            }
            Some(RecurrenceChange::Clear) => {
                self.materializer
                    .remove_unclaimed(uow.as_mut(), request_id, true)
                    .await?;
                uow.delete_schedule(request_id).await?;
                stored.request.is_recurring = false;
            }
            None => {}
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

        intents.push(NotificationIntent::new(
            NotificationAction::RequestEdited,
            json!({
                "service_request_id": request_id,
                "owner_id": stored.request.owner_id,
                "status": stored.request.status,
            }),
        ));

        uow.commit().await?;

        info!(
            service_request_id = request_id,
            redistributed = redistributes,
            generated = generated_ids.len(),
            "service request edited"
        );
        Ok(RequestOutcome {
            request: stored.request,
            generated_ids,
            intents,
        })
    }
}
