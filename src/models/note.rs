use crate::models::actor::Actor;
use crate::state_machine::states::RequestStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only audit note on a service request.
///
/// Every visible transition writes exactly one note carrying the status pair
/// it crossed. The only mutation ever applied is the explicit text edit use
/// case; status fields and media are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestNote {
    pub id: i64,
    pub service_request_id: i64,
    /// `None` for the creation note
    pub status_before: Option<RequestStatus>,
    pub status_after: RequestStatus,
    pub author: Actor,
    pub text: Option<String>,
    /// Media URLs attached by the author; storage itself is out of scope
    pub media: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// New note for insertion (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequestNote {
    pub service_request_id: i64,
    pub status_before: Option<RequestStatus>,
    pub status_after: RequestStatus,
    pub author: Actor,
    pub text: Option<String>,
    pub media: Vec<String>,
}

impl NewRequestNote {
    /// Note for a status transition, without text or media
    pub fn transition(
        service_request_id: i64,
        status_before: RequestStatus,
        status_after: RequestStatus,
        author: Actor,
    ) -> Self {
        Self {
            service_request_id,
            status_before: Some(status_before),
            status_after,
            author,
            text: None,
            media: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_media(mut self, media: Vec<String>) -> Self {
        self.media = media;
        self
    }
}
