use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Actions a notification intent can announce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    RequestCreated,
    RequestEdited,
    CandidatesOffered,
    RequestClaimed,
    WorkStarted,
    DepositRequested,
    DepositPaid,
    RequestPartiallyCompleted,
    RequestCompleted,
    VendorReleased,
    RequestCancelled,
    ApprovalRequested,
    ApprovalResolved,
}

impl NotificationAction {
    /// Stable action name for downstream consumers
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::RequestCreated => "request.created",
            Self::RequestEdited => "request.edited",
            Self::CandidatesOffered => "request.candidates_offered",
            Self::RequestClaimed => "request.claimed",
            Self::WorkStarted => "request.work_started",
            Self::DepositRequested => "request.deposit_requested",
            Self::DepositPaid => "request.deposit_paid",
            Self::RequestPartiallyCompleted => "request.partially_completed",
            Self::RequestCompleted => "request.completed",
            Self::VendorReleased => "request.vendor_released",
            Self::RequestCancelled => "request.cancelled",
            Self::ApprovalRequested => "request.approval_requested",
            Self::ApprovalResolved => "request.approval_resolved",
        }
    }
}

/// One outbound notification, produced inside a use case and dispatched only
/// after its unit of work commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub id: Uuid,
    pub action: NotificationAction,
    pub parameters: Value,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationIntent {
    pub fn new(action: NotificationAction, parameters: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            parameters,
            emails: Vec::new(),
            phones: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_contacts(mut self, emails: Vec<String>, phones: Vec<String>) -> Self {
        self.emails = emails;
        self.phones = phones;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_are_stable() {
        assert_eq!(
            NotificationAction::RequestClaimed.action_name(),
            "request.claimed"
        );
        assert_eq!(
            NotificationAction::CandidatesOffered.action_name(),
            "request.candidates_offered"
        );
    }

    #[test]
    fn test_intent_construction() {
        let intent = NotificationIntent::new(
            NotificationAction::RequestCreated,
            serde_json::json!({"service_request_id": 42}),
        )
        .with_contacts(vec!["owner@example.com".to_string()], vec![]);

        assert_eq!(intent.action, NotificationAction::RequestCreated);
        assert_eq!(intent.emails.len(), 1);
        assert!(intent.phones.is_empty());
        assert_eq!(intent.parameters["service_request_id"], 42);
    }
}
