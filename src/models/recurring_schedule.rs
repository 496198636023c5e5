use crate::recurrence::{RecurrenceRule, RecurrenceUnit};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Persisted recurrence parameters of a recurring template request.
///
/// One-to-one with the template; replaced wholesale on edit and deleted when
/// recurrence is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    pub service_request_id: i64,
    pub interval: u32,
    pub unit: RecurrenceUnit,
    /// Terminal date; no occurrence is generated past it
    pub until: NaiveDate,
    pub weekdays: Vec<Weekday>,
}

impl RecurringSchedule {
    pub fn from_rule(service_request_id: i64, rule: &RecurrenceRule) -> Self {
        Self {
            service_request_id,
            interval: rule.interval,
            unit: rule.unit,
            until: rule.until,
            weekdays: rule.weekdays.clone(),
        }
    }

    pub fn rule(&self) -> RecurrenceRule {
        RecurrenceRule {
            interval: self.interval,
            unit: self.unit,
            until: self.until,
            weekdays: self.weekdays.clone(),
        }
    }
}
