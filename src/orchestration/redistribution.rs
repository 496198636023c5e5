//! Shared distribution plumbing: plan resolution against the vendor
//! directory, claim-row application, and candidate-offer intents.

use serde_json::json;
use tracing::debug;

use crate::distribution::{self, DistributionPlan};
use crate::error::EngineResult;
use crate::events::{NotificationAction, NotificationIntent};
use crate::gateway::persistence::UnitOfWork;
use crate::gateway::vendors::VendorDirectory;
use crate::models::ServiceRequest;

/// Resolve a distribution plan for a request's coordinates.
///
/// The preferred-vendor directory is consulted only when no explicit choice
/// was made, mirroring the strategy precedence.
pub(crate) async fn resolve_plan(
    vendors: &dyn VendorDirectory,
    explicit: &[i64],
    property_id: i64,
    service_type_id: i64,
    franchise_id: i64,
) -> EngineResult<DistributionPlan> {
    let preferred: Vec<i64> = if explicit.is_empty() {
        vendors
            .preferred_vendors(property_id, service_type_id, franchise_id)
            .await?
            .into_iter()
            .map(|contact| contact.vendor_id)
            .collect()
    } else {
        Vec::new()
    };

    let plan = distribution::resolve(explicit, &preferred);
    debug!(
        distribution_type = %plan.distribution_type,
        candidate_count = plan.candidates.len(),
        "resolved distribution plan"
    );
    Ok(plan)
}

/// Replace the live claim rows with the plan's candidate set.
pub(crate) async fn apply_claim_rows(
    uow: &mut dyn UnitOfWork,
    request_id: i64,
    plan: &DistributionPlan,
) -> EngineResult<()> {
    if plan.candidates.is_empty() {
        uow.delete_claim_rows(request_id).await
    } else {
        uow.replace_claim_rows(request_id, &plan.candidates).await
    }
}

/// Build the candidate-offer intent for the vendors who were not already
/// offered the request. Returns nothing when no one new is offered.
pub(crate) async fn offer_intent(
    vendors: &dyn VendorDirectory,
    request: &ServiceRequest,
    previously_offered: &[i64],
    candidates: &[i64],
) -> EngineResult<Option<NotificationIntent>> {
    let newly_offered = distribution::newly_offered(previously_offered, candidates);
    if newly_offered.is_empty() {
        return Ok(None);
    }

    let contacts = vendors.contacts(&newly_offered).await?;
    let emails = contacts
        .iter()
        .flat_map(|contact| contact.emails.iter().cloned())
        .collect();
    let phones = contacts
        .iter()
        .flat_map(|contact| contact.phones.iter().cloned())
        .collect();

    Ok(Some(
        NotificationIntent::new(
            NotificationAction::CandidatesOffered,
            json!({
                "service_request_id": request.id,
                "property_id": request.property_id,
                "service_type_id": request.service_type_id,
                "vendor_ids": newly_offered,
            }),
        )
        .with_contacts(emails, phones),
    ))
}
