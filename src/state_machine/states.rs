use serde::{Deserialize, Serialize};
use std::fmt;

/// Service request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// No candidate vendors hold the request; eligible vendors self-claim
    NotYetAssigned,
    /// One or more candidate vendors hold first right to claim
    Claimed,
    /// A vendor accepted the request and is committed to the window
    Scheduled,
    /// The assigned vendor is on site / working
    InProgress,
    /// Work is gated on an externally confirmed deposit payment
    DepositRequired,
    /// Work ended with open items; may spawn follow-up child requests
    PartiallyCompleted,
    /// Work ended successfully
    CompletedSuccessfully,
    /// The owner rejected the request before the normal lifecycle
    Rejected,
    /// The request was cancelled; prior status is kept for audit
    Cancelled,
}

impl RequestStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PartiallyCompleted
                | Self::CompletedSuccessfully
                | Self::Rejected
                | Self::Cancelled
        )
    }

    /// Check if a vendor is assigned in this state
    pub fn is_vendor_assigned(&self) -> bool {
        matches!(
            self,
            Self::Scheduled
                | Self::InProgress
                | Self::DepositRequired
                | Self::PartiallyCompleted
                | Self::CompletedSuccessfully
        )
    }

    /// Check if the request is still in the claim window (claim rows may exist)
    pub fn is_claim_window(&self) -> bool {
        matches!(self, Self::NotYetAssigned | Self::Claimed)
    }

    /// Check if active work is underway
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress | Self::DepositRequired)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetAssigned => write!(f, "not_yet_assigned"),
            Self::Claimed => write!(f, "claimed"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::InProgress => write!(f, "in_progress"),
            Self::DepositRequired => write!(f, "deposit_required"),
            Self::PartiallyCompleted => write!(f, "partially_completed"),
            Self::CompletedSuccessfully => write!(f, "completed_successfully"),
            Self::Rejected => write!(f, "rejected"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_yet_assigned" => Ok(Self::NotYetAssigned),
            "claimed" => Ok(Self::Claimed),
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "deposit_required" => Ok(Self::DepositRequired),
            "partially_completed" => Ok(Self::PartiallyCompleted),
            "completed_successfully" => Ok(Self::CompletedSuccessfully),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid request status: {s}")),
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        Self::NotYetAssigned
    }
}

/// Owner approval track for discrepancy, guest, and child requests.
///
/// Orthogonal to [`RequestStatus`]: owners never set status directly, they only
/// resolve this track, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerApprovalStatus {
    UnApproved,
    Approved,
    Rejected,
}

impl OwnerApprovalStatus {
    /// Check if the approval track has been resolved
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::UnApproved)
    }
}

impl fmt::Display for OwnerApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnApproved => write!(f, "un_approved"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for OwnerApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "un_approved" => Ok(Self::UnApproved),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Invalid owner approval status: {s}")),
        }
    }
}

impl Default for OwnerApprovalStatus {
    fn default() -> Self {
        Self::UnApproved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RequestStatus::PartiallyCompleted.is_terminal());
        assert!(RequestStatus::CompletedSuccessfully.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(!RequestStatus::NotYetAssigned.is_terminal());
        assert!(!RequestStatus::Claimed.is_terminal());
        assert!(!RequestStatus::Scheduled.is_terminal());
        assert!(!RequestStatus::InProgress.is_terminal());
        assert!(!RequestStatus::DepositRequired.is_terminal());
    }

    #[test]
    fn test_vendor_assignment_window() {
        assert!(RequestStatus::Scheduled.is_vendor_assigned());
        assert!(RequestStatus::DepositRequired.is_vendor_assigned());
        assert!(RequestStatus::CompletedSuccessfully.is_vendor_assigned());
        assert!(!RequestStatus::NotYetAssigned.is_vendor_assigned());
        assert!(!RequestStatus::Claimed.is_vendor_assigned());
        assert!(!RequestStatus::Cancelled.is_vendor_assigned());
        assert!(!RequestStatus::Rejected.is_vendor_assigned());
    }

    #[test]
    fn test_claim_window() {
        assert!(RequestStatus::NotYetAssigned.is_claim_window());
        assert!(RequestStatus::Claimed.is_claim_window());
        assert!(!RequestStatus::Scheduled.is_claim_window());
    }

    #[test]
    fn test_status_string_conversion() {
        assert_eq!(RequestStatus::DepositRequired.to_string(), "deposit_required");
        assert_eq!(
            "partially_completed".parse::<RequestStatus>().unwrap(),
            RequestStatus::PartiallyCompleted
        );
        assert!("unknown".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_status_serde() {
        let status = RequestStatus::NotYetAssigned;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"not_yet_assigned\"");

        let parsed: RequestStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }

    #[test]
    fn test_approval_resolution() {
        assert!(!OwnerApprovalStatus::UnApproved.is_resolved());
        assert!(OwnerApprovalStatus::Approved.is_resolved());
        assert!(OwnerApprovalStatus::Rejected.is_resolved());
        assert_eq!(
            "un_approved".parse::<OwnerApprovalStatus>().unwrap(),
            OwnerApprovalStatus::UnApproved
        );
    }
}
