//! # Request Initializer
//!
//! Atomic creation of service requests: top-level creates (with media, linen,
//! and recurrence artifacts) and follow-up child requests under partially
//! completed parents. Everything a create touches lands in one unit of work;
//! notification intents are returned for post-commit dispatch.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{NotificationAction, NotificationIntent};
use crate::gateway::catalog::{CatalogRef, CatalogValidator};
use crate::gateway::persistence::PersistenceGateway;
use crate::gateway::vendors::VendorDirectory;
use crate::models::{Actor, ActorRole, NewRequestNote, NewServiceRequest};
use crate::recurrence;
use crate::state_machine::states::OwnerApprovalStatus;

use super::occurrence_materializer::OccurrenceMaterializer;
use super::redistribution::{apply_claim_rows, offer_intent, resolve_plan};
use super::types::{
    load_request, validate_window, ChildRequestCommand, CreateRequestCommand, RequestOutcome,
};

/// Atomic service request creation
pub struct RequestInitializer {
    gateway: Arc<dyn PersistenceGateway>,
    catalog: Arc<dyn CatalogValidator>,
    vendors: Arc<dyn VendorDirectory>,
    materializer: OccurrenceMaterializer,
}

impl RequestInitializer {
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

    /// Create a top-level service request.
    #[instrument(skip(self, command), fields(property_id = command.property_id))]
    pub async fn create(
        &self,
        actor: Actor,
        command: CreateRequestCommand,
    ) -> EngineResult<RequestOutcome> {
        match actor.role {
            ActorRole::Admin => {}
            ActorRole::Owner if actor.id == command.owner_id => {}
            ActorRole::Owner => {
                return Err(EngineError::authorization(
                    "owners may only create requests for themselves".to_string(),
                ));
            }
            _ => {
                return Err(EngineError::authorization(format!(
                    "actor {actor} may not create service requests"
                )));
            }
        }
        validate_window(command.scheduled_start, command.scheduled_end)?;

        // Out-of-horizon recurrence is rejected before anything is written
        if let Some(rule) = &command.recurrence {
            recurrence::validate_rule(
                command.scheduled_start.date_naive(),
                rule,
                self.materializer_horizon(),
            )?;
        }

        let catalog_ref = CatalogRef {
            franchise_id: command.franchise_id,
            property_id: command.property_id,
            service_type_id: command.service_type_id,
        };
        self.catalog
            .eligibility(&catalog_ref)
            .await?
            .ensure_for(&catalog_ref, command.is_guest)?;

        let plan = resolve_plan(
            self.vendors.as_ref(),
            &command.explicit_vendor_ids,
            command.property_id,
            command.service_type_id,
            command.franchise_id,
        )
        .await?;

        let owner_approval = if command.is_guest {
            OwnerApprovalStatus::UnApproved
        } else {
            OwnerApprovalStatus::Approved
        };

        let mut uow = self.gateway.begin().await?;
        let stored = uow
            .insert_request(NewServiceRequest {
                franchise_id: command.franchise_id,
                property_id: command.property_id,
                service_type_id: command.service_type_id,
                owner_id: command.owner_id,
                status: plan.initial_status,
                owner_approval,
                distribution_type: plan.distribution_type,
                priority: command.priority,
                description: command.description.clone(),
                scheduled_start: command.scheduled_start,
                scheduled_end: command.scheduled_end,
                parent_id: None,
                is_discrepancy: false,
                is_guest: command.is_guest,
                is_guest_concierge: command.is_guest_concierge,
                is_recurring: command.recurrence.is_some(),
                is_turn_over: command.is_turn_over,
                linen_detail: command.linen_detail.clone(),
                created_by: actor,
            })
            .await?;
        let request = stored.request.clone();

        apply_claim_rows(uow.as_mut(), request.id, &plan).await?;

        uow.insert_note(NewRequestNote {
            service_request_id: request.id,
            status_before: None,
            status_after: request.status,
            author: actor,
            text: command.note_text.clone(),
            media: command.media.clone(),
        })
        .await?;

        let mut generated_ids = Vec::new();
        if let Some(rule) = &command.recurrence {
            let schedule = crate::models::RecurringSchedule::from_rule(request.id, rule);
            uow.put_schedule(&schedule).await?;
            generated_ids = self
                .materializer
                .materialize(
                    uow.as_mut(),
                    &request,
                    rule,
                    &plan.candidates,
                    &std::collections::HashSet::new(),
                )
                .await?;
        }

        let mut intents = vec![NotificationIntent::new(
            NotificationAction::RequestCreated,
            json!({
                "service_request_id": request.id,
                "property_id": request.property_id,
                "service_type_id": request.service_type_id,
                "status": request.status,
            }),
        )];
        if owner_approval == OwnerApprovalStatus::UnApproved {
            intents.push(NotificationIntent::new(
                NotificationAction::ApprovalRequested,
                json!({
                    "service_request_id": request.id,
                    "owner_id": request.owner_id,
                }),
            ));
        }
        // Candidates on approval-gated requests hear nothing until the owner
        // approves; the approval flow re-runs distribution and offers then.
        if owner_approval == OwnerApprovalStatus::Approved {
            if let Some(offer) =
                offer_intent(self.vendors.as_ref(), &request, &[], &plan.candidates).await?
            {
                intents.push(offer);
            }
        }

        uow.commit().await?;

        info!(
            service_request_id = request.id,
            status = %request.status,
            distribution_type = %request.distribution_type,
            generated = generated_ids.len(),
            "service request created"
        );
        Ok(RequestOutcome {
            request,
            generated_ids,
            intents,
        })
    }

    /// Create a follow-up child request under a partially completed parent.
    ///
    /// One follow-up per creating actor: a second attempt by the same actor is
    /// a state conflict, whatever became of the first one.
    #[instrument(skip(self, command), fields(parent_id = command.parent_id))]
    pub async fn create_child(
        &self,
        actor: Actor,
        command: ChildRequestCommand,
    ) -> EngineResult<RequestOutcome> {
        validate_window(command.scheduled_start, command.scheduled_end)?;

        let mut uow = self.gateway.begin().await?;
        let parent = load_request(uow.as_mut(), command.parent_id).await?.request;

        if parent.status != crate::state_machine::states::RequestStatus::PartiallyCompleted {
            return Err(EngineError::state_conflict(format!(
                "service request {} is {}, only partially completed requests take follow-ups",
                parent.id, parent.status
            )));
        }
        if parent.parent_id.is_some() {
            return Err(EngineError::validation(format!(
                "service request {} is itself a follow-up and cannot have children",
                parent.id
            )));
        }
        match actor.role {
            ActorRole::Admin => {}
            ActorRole::Owner if actor.id == parent.owner_id => {}
            ActorRole::Vendor if parent.vendor_id == Some(actor.id) => {}
            _ => {
                return Err(EngineError::authorization(format!(
                    "actor {actor} may not create a follow-up for service request {}",
                    parent.id
                )));
            }
        }
        let duplicate = uow
            .children_of(parent.id)
            .await?
            .into_iter()
            .any(|child| child.created_by == actor);
        if duplicate {
            return Err(EngineError::state_conflict(format!(
                "actor {actor} already created a follow-up for service request {}",
                parent.id
            )));
        }

        let catalog_ref = CatalogRef {
            franchise_id: parent.franchise_id,
            property_id: parent.property_id,
            service_type_id: parent.service_type_id,
        };
        self.catalog
            .eligibility(&catalog_ref)
            .await?
            .ensure_for(&catalog_ref, parent.is_guest)?;

        let plan = resolve_plan(
            self.vendors.as_ref(),
            &[],
            parent.property_id,
            parent.service_type_id,
            parent.franchise_id,
        )
        .await?;

        let stored = uow
            .insert_request(NewServiceRequest {
                franchise_id: parent.franchise_id,
                property_id: parent.property_id,
                service_type_id: parent.service_type_id,
                owner_id: parent.owner_id,
                status: plan.initial_status,
                owner_approval: OwnerApprovalStatus::UnApproved,
                distribution_type: plan.distribution_type,
                priority: command.priority,
                description: command.description.clone(),
                scheduled_start: command.scheduled_start,
                scheduled_end: command.scheduled_end,
                parent_id: Some(parent.id),
                is_discrepancy: true,
                is_guest: parent.is_guest,
                is_guest_concierge: parent.is_guest_concierge,
                is_recurring: false,
                is_turn_over: false,
                linen_detail: None,
                created_by: actor,
            })
            .await?;
        let child = stored.request.clone();

        apply_claim_rows(uow.as_mut(), child.id, &plan).await?;

        uow.insert_note(NewRequestNote {
            service_request_id: child.id,
            status_before: None,
            status_after: child.status,
            author: actor,
            text: command.note_text.clone(),
            media: command.media.clone(),
        })
        .await?;

        // Candidates are not notified until the owner approves; the claim
        // processor refuses unapproved requests either way.
        let intents = vec![NotificationIntent::new(
            NotificationAction::ApprovalRequested,
            json!({
                "service_request_id": child.id,
                "parent_request_id": parent.id,
                "owner_id": child.owner_id,
            }),
        )];

        uow.commit().await?;

        info!(
            service_request_id = child.id,
            parent_id = parent.id,
            "follow-up request created"
        );
        Ok(RequestOutcome {
            request: child,
            generated_ids: Vec::new(),
            intents,
        })
    }

    fn materializer_horizon(&self) -> u32 {
        self.materializer.horizon_days()
    }
}
