use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Links a recurring template to one materialized occurrence.
///
/// `occurrence_date` is the idempotency key: materialization never creates a
/// second sibling for a (template, date) pair that already has a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceLink {
    pub main_request_id: i64,
    pub generated_request_id: i64,
    pub occurrence_date: NaiveDate,
}
