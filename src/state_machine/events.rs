use serde::{Deserialize, Serialize};

/// Events that can trigger service request state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RequestEvent {
    /// Offer the request to a resolved candidate set (redistribution)
    OfferToCandidates,
    /// Return the request to the open pool (redistribution off claim rows)
    ReturnToPool,
    /// A vendor accepts the request
    Claim { vendor_id: i64 },
    /// The assigned vendor begins work
    StartWork,
    /// Gate further work on a deposit payment
    RequireDeposit,
    /// External signal: the deposit was paid
    DepositPaid,
    /// Work ended with open items
    CompletePartially,
    /// Work ended successfully
    Complete,
    /// The assigned vendor walks away from the request
    Release,
    /// Cancel the request
    Cancel,
    /// The owner rejected the request on its approval track
    OwnerReject,
}

impl RequestEvent {
    /// Get a string representation of the event type for logging and notes
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OfferToCandidates => "offer_to_candidates",
            Self::ReturnToPool => "return_to_pool",
            Self::Claim { .. } => "claim",
            Self::StartWork => "start_work",
            Self::RequireDeposit => "require_deposit",
            Self::DepositPaid => "deposit_paid",
            Self::CompletePartially => "complete_partially",
            Self::Complete => "complete",
            Self::Release => "release",
            Self::Cancel => "cancel",
            Self::OwnerReject => "owner_reject",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CompletePartially | Self::Complete | Self::Cancel | Self::OwnerReject
        )
    }

    /// Extract the claiming vendor if this is a claim event
    pub fn claiming_vendor(&self) -> Option<i64> {
        match self {
            Self::Claim { vendor_id } => Some(*vendor_id),
            _ => None,
        }
    }
}
