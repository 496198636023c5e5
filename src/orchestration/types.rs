//! Commands and outcomes shared by the orchestration use cases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::events::NotificationIntent;
use crate::gateway::persistence::{StoredRequest, UnitOfWork};
use crate::models::{Priority, ServiceRequest};
use crate::recurrence::RecurrenceRule;

/// Create a top-level service request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestCommand {
    pub franchise_id: i64,
    pub property_id: i64,
    pub service_type_id: i64,
    pub owner_id: i64,
    pub priority: Priority,
    pub description: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    /// Explicit vendor choice; empty means preferred-then-open-pool resolution
    pub explicit_vendor_ids: Vec<i64>,
    pub is_guest: bool,
    pub is_guest_concierge: bool,
    pub is_turn_over: bool,
    pub linen_detail: Option<Value>,
    /// Media URLs attached to the creation note
    pub media: Vec<String>,
    pub note_text: Option<String>,
    pub recurrence: Option<RecurrenceRule>,
}

/// Create a follow-up request under a partially completed parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildRequestCommand {
    pub parent_id: i64,
    pub priority: Priority,
    pub description: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub media: Vec<String>,
    pub note_text: Option<String>,
}

/// Recurrence parameter change on edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecurrenceChange {
    Set(RecurrenceRule),
    Clear,
}

/// Edit a service request; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditRequestCommand {
    pub request_id: i64,
    pub priority: Option<Priority>,
    pub description: Option<String>,
    pub service_type_id: Option<i64>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    /// Replaces the explicit vendor choice and re-resolves distribution
    pub explicit_vendor_ids: Option<Vec<i64>>,
    pub is_turn_over: Option<bool>,
    pub linen_detail: Option<Value>,
    pub recurrence: Option<RecurrenceChange>,
}

/// Owner resolution of the approval track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// Result of one committed use case.
///
/// `intents` have not been delivered yet; the caller drains them through a
/// [`crate::events::NotificationDispatcher`] after this value is returned.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub request: ServiceRequest,
    /// Siblings materialized by this use case, if any
    pub generated_ids: Vec<i64>,
    pub intents: Vec<NotificationIntent>,
}

impl RequestOutcome {
    pub fn new(request: ServiceRequest) -> Self {
        Self {
            request,
            generated_ids: Vec::new(),
            intents: Vec::new(),
        }
    }
}

/// Load an aggregate or fail with `NotFound`
pub(crate) async fn load_request(
    uow: &mut dyn UnitOfWork,
    request_id: i64,
) -> EngineResult<StoredRequest> {
    uow.find_request(request_id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("service request {request_id}")))
}

/// Scheduled windows must have positive duration
pub(crate) fn validate_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> EngineResult<()> {
    if end <= start {
        return Err(EngineError::validation(format!(
            "scheduled end {end} is not after scheduled start {start}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_validation() {
        let start = Utc::now();
        assert!(validate_window(start, start + chrono::Duration::hours(1)).is_ok());
        assert!(validate_window(start, start).is_err());
        assert!(validate_window(start, start - chrono::Duration::hours(1)).is_err());
    }
}
