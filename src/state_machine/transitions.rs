//! Pure transition planning for the service request lifecycle.
//!
//! The table is the single source of truth for which (status, event) pairs are
//! legal and which role classes may issue each event. Identity-level guards
//! (claim-row possession, assigned-vendor match, owner match) need aggregate
//! data and live in [`super::guards`]; everything here is a pure function.

use super::errors::{StateMachineError, StateMachineResult};
use super::events::RequestEvent;
use super::states::RequestStatus;
use crate::models::actor::ActorRole;

/// A planned transition, ready to be persisted by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTransition {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

/// Plan a transition for (current status, actor role, event).
///
/// State legality is checked first: a (status, event) pair outside the table
/// is a `StateConflict` regardless of who asked. Role legality is checked
/// second and yields `Authorization`.
pub fn plan_transition(
    current: RequestStatus,
    actor_role: ActorRole,
    event: &RequestEvent,
) -> StateMachineResult<PlannedTransition> {
    let target = target_for(current, event).ok_or_else(|| StateMachineError::InvalidTransition {
        from: current,
        event: event.event_type().to_string(),
    })?;

    if !role_allowed(actor_role, event) {
        return Err(StateMachineError::UnauthorizedActor {
            role: actor_role,
            event: event.event_type().to_string(),
        });
    }

    Ok(PlannedTransition {
        from: current,
        to: target,
    })
}

/// The allowed-next table. `None` means the pair is illegal.
fn target_for(current: RequestStatus, event: &RequestEvent) -> Option<RequestStatus> {
    use RequestEvent as E;
    use RequestStatus as S;

    let target = match (current, event) {
        // Redistribution between the open pool and candidate offers
        (S::NotYetAssigned, E::OfferToCandidates) => S::Claimed,
        (S::Claimed, E::ReturnToPool) => S::NotYetAssigned,

        // Claiming: from a candidate offer, or self-claim out of the open pool
        (S::NotYetAssigned | S::Claimed, E::Claim { .. }) => S::Scheduled,

        // Normal forward progression
        (S::Scheduled, E::StartWork) => S::InProgress,
        (S::Scheduled | S::InProgress, E::RequireDeposit) => S::DepositRequired,
        (S::DepositRequired, E::DepositPaid) => S::InProgress,
        (S::InProgress, E::CompletePartially) => S::PartiallyCompleted,
        (S::InProgress, E::Complete) => S::CompletedSuccessfully,

        // The only legal backward edge: explicit release
        (S::Scheduled | S::InProgress, E::Release) => S::NotYetAssigned,

        // Terminal edges from any non-terminal state
        (s, E::Cancel) if !s.is_terminal() => S::Cancelled,
        (s, E::OwnerReject) if !s.is_terminal() => S::Rejected,

        _ => return None,
    };

    Some(target)
}

/// Role classes permitted to issue each event. Owners never set status
/// directly; their only terminal levers are cancel and approval rejection.
fn role_allowed(role: ActorRole, event: &RequestEvent) -> bool {
    use ActorRole as R;
    use RequestEvent as E;

    match event {
        E::OfferToCandidates | E::ReturnToPool | E::DepositPaid => {
            matches!(role, R::Admin | R::System)
        }
        E::Claim { .. } => matches!(role, R::Vendor),
        E::StartWork | E::RequireDeposit | E::CompletePartially | E::Complete | E::Release => {
            matches!(role, R::Vendor | R::Admin)
        }
        E::Cancel => matches!(role, R::Owner | R::Admin),
        E::OwnerReject => matches!(role, R::Owner),
    }
}
