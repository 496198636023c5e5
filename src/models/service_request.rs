//! # Service Request Model
//!
//! The aggregate root of the lifecycle engine. A service request is created by
//! an owner (or the platform, for generated occurrences and follow-ups) against
//! a property and service type, distributed to vendors under one of four
//! strategies, and driven through the status state machine until a terminal
//! state.
//!
//! The struct is plain data: status changes go through the state machine
//! planner and are persisted by the orchestrator inside a unit of work, never
//! by mutating a loaded aggregate outside one.

use crate::distribution::DistributionType;
use crate::models::actor::Actor;
use crate::state_machine::states::{OwnerApprovalStatus, RequestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Urgency of a service request, set by the creator and copied to generated
/// occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {s}")),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Audit record written when a request is cancelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_by: Actor,
    /// Status the request held at the moment of cancellation
    pub at_status: RequestStatus,
    pub cancelled_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// A service request aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: i64,
    /// Tenant boundary: every referenced record lives in this franchise
    pub franchise_id: i64,
    pub property_id: i64,
    pub service_type_id: i64,
    pub owner_id: i64,
    /// Set iff the status is in the vendor-assigned window
    pub vendor_id: Option<i64>,
    pub status: RequestStatus,
    pub owner_approval: OwnerApprovalStatus,
    pub distribution_type: DistributionType,
    pub priority: Priority,
    pub description: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    /// Follow-up linkage: the partially-completed request this one was spawned
    /// from; always within the same franchise
    pub parent_id: Option<i64>,
    pub is_discrepancy: bool,
    pub is_guest: bool,
    pub is_guest_concierge: bool,
    /// Marks a recurring template; generated occurrences carry `false`
    pub is_recurring: bool,
    pub is_turn_over: bool,
    pub linen_detail: Option<serde_json::Value>,
    pub cancellation: Option<Cancellation>,
    pub invoice_id: Option<i64>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New service request for creation (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServiceRequest {
    pub franchise_id: i64,
    pub property_id: i64,
    pub service_type_id: i64,
    pub owner_id: i64,
    pub status: RequestStatus,
    pub owner_approval: OwnerApprovalStatus,
    pub distribution_type: DistributionType,
    pub priority: Priority,
    pub description: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub parent_id: Option<i64>,
    pub is_discrepancy: bool,
    pub is_guest: bool,
    pub is_guest_concierge: bool,
    pub is_recurring: bool,
    pub is_turn_over: bool,
    pub linen_detail: Option<serde_json::Value>,
    pub created_by: Actor,
}

impl ServiceRequest {
    /// Discrepancy, guest, and child requests all gate on the owner approval
    /// track before a vendor may claim them.
    pub fn requires_owner_approval(&self) -> bool {
        self.is_discrepancy || self.is_guest || self.parent_id.is_some()
    }

    /// Check the vendor-assignment invariant for this aggregate
    pub fn vendor_assignment_consistent(&self) -> bool {
        self.vendor_id.is_some() == self.status.is_vendor_assigned()
    }

    /// Duration of the scheduled window, preserved on generated occurrences
    pub fn scheduled_duration(&self) -> chrono::Duration {
        self.scheduled_end - self.scheduled_start
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Minimal open-pool aggregate for unit tests
    pub fn request_fixture(id: i64) -> ServiceRequest {
        let start = DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        ServiceRequest {
            id,
            franchise_id: 1,
            property_id: 10,
            service_type_id: 100,
            owner_id: 5,
            vendor_id: None,
            status: RequestStatus::NotYetAssigned,
            owner_approval: OwnerApprovalStatus::Approved,
            distribution_type: DistributionType::DistributeToAllVendors,
            priority: Priority::Medium,
            description: Some("fixture".to_string()),
            scheduled_start: start,
            scheduled_end: start + chrono::Duration::hours(2),
            parent_id: None,
            is_discrepancy: false,
            is_guest: false,
            is_guest_concierge: false,
            is_recurring: false,
            is_turn_over: false,
            linen_detail: None,
            cancellation: None,
            invoice_id: None,
            created_by: Actor::owner(5),
            created_at: start,
            updated_at: start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::request_fixture;
    use super::*;

    #[test]
    fn test_approval_requirement() {
        let mut request = request_fixture(1);
        assert!(!request.requires_owner_approval());

        request.is_guest = true;
        assert!(request.requires_owner_approval());

        request.is_guest = false;
        request.parent_id = Some(99);
        assert!(request.requires_owner_approval());
    }

    #[test]
    fn test_vendor_assignment_invariant() {
        let mut request = request_fixture(1);
        assert!(request.vendor_assignment_consistent());

        request.vendor_id = Some(3);
        assert!(!request.vendor_assignment_consistent());

        request.status = RequestStatus::Scheduled;
        assert!(request.vendor_assignment_consistent());

        request.status = RequestStatus::DepositRequired;
        assert!(request.vendor_assignment_consistent());
    }

    #[test]
    fn test_priority_round_trip() {
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!(Priority::Low.to_string(), "low");
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
