//! # Occurrence Materializer
//!
//! Turns a recurring template plus its projected dates into sibling service
//! requests, inside the caller's unit of work. Materialization is idempotent
//! per (template, occurrence date): dates that already carry an occurrence
//! link are skipped, so a re-run after a partial prior failure never
//! duplicates siblings.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::error::{EngineError, EngineResult};
use crate::gateway::persistence::UnitOfWork;
use crate::models::{NewRequestNote, NewServiceRequest, OccurrenceLink, ServiceRequest};
use crate::recurrence::{self, RecurrenceRule};
use crate::state_machine::states::RequestStatus;

/// Materializes and prunes generated occurrences for recurring templates
#[derive(Debug, Clone, Copy)]
pub struct OccurrenceMaterializer {
    horizon_days: u32,
}

/// Result of pruning a template's generated occurrences
#[derive(Debug, Clone, Default)]
pub struct PrunedOccurrences {
    /// Still-unclaimed siblings that were deleted
    pub removed_ids: Vec<i64>,
    /// Occurrence dates whose claimed siblings (and links) survive
    pub kept_dates: Vec<NaiveDate>,
}

impl OccurrenceMaterializer {
    pub fn new(horizon_days: u32) -> Self {
        Self { horizon_days }
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Project the rule and create one sibling per not-yet-linked date.
    ///
    /// `candidates` is the template's resolved candidate set; siblings under a
    /// claim-row strategy replicate it so their claim windows open identically.
    /// `already_linked` is the caller's authoritative set of dates that still
    /// carry a link — the idempotency record; staged deletes inside the same
    /// unit of work are not visible to reads, so the caller owns this set.
    #[instrument(skip(self, uow, template, rule, already_linked), fields(template_id = template.id))]
    pub async fn materialize(
        &self,
        uow: &mut dyn UnitOfWork,
        template: &ServiceRequest,
        rule: &RecurrenceRule,
        candidates: &[i64],
        already_linked: &HashSet<NaiveDate>,
    ) -> EngineResult<Vec<i64>> {
        let reference = template.scheduled_start.date_naive();
        let dates = recurrence::project(reference, rule, self.horizon_days)?;

        let mut generated_ids = Vec::new();
        let mut links = Vec::new();
        for date in dates {
            if already_linked.contains(&date) {
                continue;
            }

            let sibling = self
                .insert_sibling(uow, template, date, candidates)
                .await?;
            links.push(OccurrenceLink {
                main_request_id: template.id,
                generated_request_id: sibling.id,
                occurrence_date: date,
            });
            generated_ids.push(sibling.id);
        }
        uow.insert_links(&links).await?;

        debug!(
            generated = generated_ids.len(),
            skipped = already_linked.len(),
            "materialized recurring occurrences"
        );
        Ok(generated_ids)
    }

    /// Delete still-unclaimed siblings and their links. When `all_links` is
    /// set (recurrence disabled or template cancelled) the links of claimed
    /// siblings go too; on a re-materializing edit they are kept as the
    /// idempotency record for their dates and returned in `kept_dates`.
    #[instrument(skip(self, uow))]
    pub async fn remove_unclaimed(
        &self,
        uow: &mut dyn UnitOfWork,
        main_request_id: i64,
        all_links: bool,
    ) -> EngineResult<PrunedOccurrences> {
        let links = uow.links_for(main_request_id).await?;

        let mut removed_ids = Vec::new();
        let mut doomed_dates = Vec::new();
        let mut kept_dates = Vec::new();
        let mut all_dates = Vec::new();
        for link in &links {
            all_dates.push(link.occurrence_date);
            let claimed = match uow.find_request(link.generated_request_id).await? {
                Some(stored) => !stored.request.status.is_claim_window(),
                None => false,
            };
            if claimed {
                kept_dates.push(link.occurrence_date);
            } else {
                removed_ids.push(link.generated_request_id);
                doomed_dates.push(link.occurrence_date);
            }
        }

        let dates_to_drop = if all_links { &all_dates } else { &doomed_dates };
        uow.delete_links(main_request_id, dates_to_drop).await?;
        uow.delete_requests(&removed_ids).await?;

        debug!(
            removed = removed_ids.len(),
            links_dropped = dates_to_drop.len(),
            "pruned generated occurrences"
        );
        Ok(PrunedOccurrences {
            removed_ids,
            kept_dates,
        })
    }

    async fn insert_sibling(
        &self,
        uow: &mut dyn UnitOfWork,
        template: &ServiceRequest,
        date: NaiveDate,
        candidates: &[i64],
    ) -> EngineResult<ServiceRequest> {
        let start = occurrence_start(template.scheduled_start, date)?;
        let end = start + template.scheduled_duration();
        let status = if candidates.is_empty() {
            RequestStatus::NotYetAssigned
        } else {
            RequestStatus::Claimed
        };

        let stored = uow
            .insert_request(NewServiceRequest {
                franchise_id: template.franchise_id,
                property_id: template.property_id,
                service_type_id: template.service_type_id,
                owner_id: template.owner_id,
                status,
                owner_approval: template.owner_approval,
                distribution_type: template.distribution_type,
                priority: template.priority,
                description: template.description.clone(),
                scheduled_start: start,
                scheduled_end: end,
                parent_id: None,
                is_discrepancy: false,
                is_guest: template.is_guest,
                is_guest_concierge: template.is_guest_concierge,
                is_recurring: false,
                is_turn_over: template.is_turn_over,
                linen_detail: template.linen_detail.clone(),
                created_by: template.created_by,
            })
            .await?;

        if !candidates.is_empty() {
            uow.replace_claim_rows(stored.request.id, candidates).await?;
        }

        uow.insert_note(NewRequestNote {
            service_request_id: stored.request.id,
            status_before: None,
            status_after: status,
            author: template.created_by,
            text: None,
            media: Vec::new(),
        })
        .await?;

        Ok(stored.request)
    }
}

/// The occurrence keeps the template's start time-of-day on its own date
fn occurrence_start(
    template_start: DateTime<Utc>,
    date: NaiveDate,
) -> EngineResult<DateTime<Utc>> {
    date.and_time(template_start.time())
        .and_local_timezone(Utc)
        .single()
        .ok_or_else(|| {
            EngineError::validation(format!("occurrence date {date} yields no valid timestamp"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurrence_start_preserves_time_of_day() {
        let template_start = DateTime::parse_from_rfc3339("2024-01-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let start =
            occurrence_start(template_start, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-01-08T09:30:00+00:00");
    }
}
