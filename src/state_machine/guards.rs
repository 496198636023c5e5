//! Identity-level transition guards.
//!
//! The transition table in [`super::transitions`] checks role classes; these
//! guards check the actor against the aggregate itself. All of them return
//! [`EngineError::Authorization`] so the caller's error taxonomy stays stable.

use crate::error::{EngineError, EngineResult};
use crate::models::actor::{Actor, ActorRole};
use crate::models::service_request::ServiceRequest;
use crate::models::vendor_claim::VendorClaim;

/// Release and status progression belong to the assigned vendor or an admin.
pub fn ensure_assigned_vendor(actor: &Actor, request: &ServiceRequest) -> EngineResult<()> {
    match actor.role {
        ActorRole::Admin | ActorRole::System => Ok(()),
        ActorRole::Vendor if request.vendor_id == Some(actor.id) => Ok(()),
        ActorRole::Vendor => Err(EngineError::authorization(format!(
            "vendor {} is not assigned to service request {}",
            actor.id, request.id
        ))),
        _ => Err(EngineError::authorization(format!(
            "actor {actor} may not act on assigned work"
        ))),
    }
}

/// Claim rights: a matching claim row, or open-pool qualification resolved by
/// the caller through the vendor directory.
pub fn ensure_claim_rights(
    actor: &Actor,
    request: &ServiceRequest,
    claim_rows: &[VendorClaim],
    qualified_for_open_pool: bool,
) -> EngineResult<()> {
    let holds_row = claim_rows.iter().any(|row| row.vendor_id == actor.id);
    if holds_row {
        return Ok(());
    }

    if request.distribution_type.is_open_pool() && qualified_for_open_pool {
        return Ok(());
    }

    Err(EngineError::authorization(format!(
        "vendor {} holds no claim on service request {}",
        actor.id, request.id
    )))
}

/// Owner-scoped operations: the owning owner, or an admin.
pub fn ensure_owner_or_admin(actor: &Actor, request: &ServiceRequest) -> EngineResult<()> {
    match actor.role {
        ActorRole::Admin => Ok(()),
        ActorRole::Owner if request.owner_id == actor.id => Ok(()),
        ActorRole::Owner => Err(EngineError::authorization(format!(
            "owner {} does not own service request {}",
            actor.id, request.id
        ))),
        _ => Err(EngineError::authorization(format!(
            "actor {actor} may not manage service request {}",
            request.id
        ))),
    }
}

/// Approval resolution is owner-only, and only for the owning owner.
pub fn ensure_approval_actor(actor: &Actor, request: &ServiceRequest) -> EngineResult<()> {
    match actor.role {
        ActorRole::Owner if request.owner_id == actor.id => Ok(()),
        _ => Err(EngineError::authorization(format!(
            "only the owner of service request {} may resolve its approval",
            request.id
        ))),
    }
}
