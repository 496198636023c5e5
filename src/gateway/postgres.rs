//! # PostgreSQL Persistence Gateway
//!
//! sqlx-backed implementation of [`PersistenceGateway`]. Every unit of work is
//! one database transaction; aggregate updates are guarded with
//! `WHERE id = $1 AND version = $2`, so a lost claim race surfaces as
//! `StateConflict` the moment the losing transaction's update lands on the
//! winner's committed row. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Actor, Cancellation, NewRequestNote, NewServiceRequest, OccurrenceLink, RecurringSchedule,
    RequestNote, ServiceRequest, VendorClaim,
};

use super::persistence::{PersistenceGateway, StoredRequest, UnitOfWork};

/// Gateway handle over a connection pool
#[derive(Debug, Clone)]
pub struct PostgresGateway {
    pool: PgPool,
}

impl PostgresGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersistenceGateway for PostgresGateway {
    async fn begin(&self) -> EngineResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

const REQUEST_COLUMNS: &str = "id, franchise_id, property_id, service_type_id, owner_id, \
     vendor_id, status, owner_approval, distribution_type, priority, description, \
     scheduled_start, scheduled_end, parent_id, is_discrepancy, is_guest, \
     is_guest_concierge, is_recurring, is_turn_over, linen_detail, \
     cancelled_by_role, cancelled_by_id, cancelled_at_status, cancelled_at, \
     cancellation_reason, invoice_id, created_by_role, created_by_id, \
     created_at, updated_at, version";

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_request(&mut self, id: i64) -> EngineResult<Option<StoredRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM steward_service_requests WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.map(|row| map_stored_request(&row)).transpose()
    }

    async fn insert_request(
        &mut self,
        new_request: NewServiceRequest,
    ) -> EngineResult<StoredRequest> {
        let sql = format!(
            "INSERT INTO steward_service_requests (\
                 franchise_id, property_id, service_type_id, owner_id, status, \
                 owner_approval, distribution_type, priority, description, \
                 scheduled_start, scheduled_end, parent_id, is_discrepancy, is_guest, \
                 is_guest_concierge, is_recurring, is_turn_over, linen_detail, \
                 created_by_role, created_by_id, created_at, updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                 $15, $16, $17, $18, $19, $20, NOW(), NOW(), 1) \
             RETURNING {REQUEST_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(new_request.franchise_id)
            .bind(new_request.property_id)
            .bind(new_request.service_type_id)
            .bind(new_request.owner_id)
            .bind(new_request.status.to_string())
            .bind(new_request.owner_approval.to_string())
            .bind(new_request.distribution_type.to_string())
            .bind(new_request.priority.to_string())
            .bind(&new_request.description)
            .bind(new_request.scheduled_start)
            .bind(new_request.scheduled_end)
            .bind(new_request.parent_id)
            .bind(new_request.is_discrepancy)
            .bind(new_request.is_guest)
            .bind(new_request.is_guest_concierge)
            .bind(new_request.is_recurring)
            .bind(new_request.is_turn_over)
            .bind(&new_request.linen_detail)
            .bind(new_request.created_by.role.to_string())
            .bind(new_request.created_by.id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        map_stored_request(&row)
    }

    async fn update_request(&mut self, stored: &StoredRequest) -> EngineResult<()> {
        let request = &stored.request;
        let cancellation = request.cancellation.as_ref();
        let result = sqlx::query(
            "UPDATE steward_service_requests SET \
                 service_type_id = $3, vendor_id = $4, status = $5, owner_approval = $6, \
                 distribution_type = $7, priority = $8, description = $9, \
                 scheduled_start = $10, scheduled_end = $11, is_turn_over = $12, \
                 is_recurring = $13, linen_detail = $14, cancelled_by_role = $15, \
                 cancelled_by_id = $16, cancelled_at_status = $17, cancelled_at = $18, \
                 cancellation_reason = $19, invoice_id = $20, \
                 updated_at = NOW(), version = version + 1 \
             WHERE id = $1 AND version = $2",
        )
        .bind(request.id)
        .bind(stored.version)
        .bind(request.service_type_id)
        .bind(request.vendor_id)
        .bind(request.status.to_string())
        .bind(request.owner_approval.to_string())
        .bind(request.distribution_type.to_string())
        .bind(request.priority.to_string())
        .bind(&request.description)
        .bind(request.scheduled_start)
        .bind(request.scheduled_end)
        .bind(request.is_turn_over)
        .bind(request.is_recurring)
        .bind(&request.linen_detail)
        .bind(cancellation.map(|c| c.cancelled_by.role.to_string()))
        .bind(cancellation.map(|c| c.cancelled_by.id))
        .bind(cancellation.map(|c| c.at_status.to_string()))
        .bind(cancellation.map(|c| c.cancelled_at))
        .bind(cancellation.and_then(|c| c.reason.clone()))
        .bind(request.invoice_id)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::state_conflict(format!(
                "service request {} was modified concurrently",
                request.id
            )));
        }
        Ok(())
    }

    async fn delete_requests(&mut self, ids: &[i64]) -> EngineResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("DELETE FROM steward_vendor_claims WHERE service_request_id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM steward_request_notes WHERE service_request_id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM steward_occurrence_links WHERE generated_request_id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM steward_recurring_schedules WHERE service_request_id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM steward_service_requests WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn children_of(&mut self, parent_id: i64) -> EngineResult<Vec<ServiceRequest>> {
        let sql =
            format!("SELECT {REQUEST_COLUMNS} FROM steward_service_requests WHERE parent_id = $1");
        let rows = sqlx::query(&sql)
            .bind(parent_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| map_stored_request(row).map(|stored| stored.request))
            .collect()
    }

    async fn claim_rows(&mut self, request_id: i64) -> EngineResult<Vec<VendorClaim>> {
        let rows = sqlx::query(
            "SELECT service_request_id, vendor_id, status, created_at \
             FROM steward_vendor_claims WHERE service_request_id = $1 ORDER BY created_at",
        )
        .bind(request_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_claim_row).collect()
    }

    async fn replace_claim_rows(
        &mut self,
        request_id: i64,
        vendor_ids: &[i64],
    ) -> EngineResult<()> {
        sqlx::query("DELETE FROM steward_vendor_claims WHERE service_request_id = $1")
            .bind(request_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        for vendor_id in vendor_ids {
            sqlx::query(
                "INSERT INTO steward_vendor_claims \
                     (service_request_id, vendor_id, status, created_at) \
                 VALUES ($1, $2, $3, NOW())",
            )
            .bind(request_id)
            .bind(vendor_id)
            .bind(crate::models::ClaimStatus::Claimed.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    async fn delete_claim_rows(&mut self, request_id: i64) -> EngineResult<()> {
        sqlx::query("DELETE FROM steward_vendor_claims WHERE service_request_id = $1")
            .bind(request_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn schedule_for(&mut self, request_id: i64) -> EngineResult<Option<RecurringSchedule>> {
        let row = sqlx::query(
            "SELECT service_request_id, interval_count, unit, until, weekdays \
             FROM steward_recurring_schedules WHERE service_request_id = $1",
        )
        .bind(request_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.map(|row| map_schedule_row(&row)).transpose()
    }

    async fn put_schedule(&mut self, schedule: &RecurringSchedule) -> EngineResult<()> {
        let weekdays = serde_json::to_value(&schedule.weekdays)
            .map_err(|e| EngineError::dependency(format!("weekday encoding failed: {e}")))?;
        sqlx::query(
            "INSERT INTO steward_recurring_schedules \
                 (service_request_id, interval_count, unit, until, weekdays) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (service_request_id) DO UPDATE SET \
                 interval_count = EXCLUDED.interval_count, unit = EXCLUDED.unit, \
                 until = EXCLUDED.until, weekdays = EXCLUDED.weekdays",
        )
        .bind(schedule.service_request_id)
        .bind(i64::from(schedule.interval))
        .bind(schedule.unit.to_string())
        .bind(schedule.until)
        .bind(weekdays)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_schedule(&mut self, request_id: i64) -> EngineResult<()> {
        sqlx::query("DELETE FROM steward_recurring_schedules WHERE service_request_id = $1")
            .bind(request_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn links_for(&mut self, main_request_id: i64) -> EngineResult<Vec<OccurrenceLink>> {
        let rows = sqlx::query(
            "SELECT main_request_id, generated_request_id, occurrence_date \
             FROM steward_occurrence_links WHERE main_request_id = $1 \
             ORDER BY occurrence_date",
        )
        .bind(main_request_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_link_row).collect()
    }

    async fn insert_links(&mut self, links: &[OccurrenceLink]) -> EngineResult<()> {
        for link in links {
            sqlx::query(
                "INSERT INTO steward_occurrence_links \
                     (main_request_id, generated_request_id, occurrence_date) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (main_request_id, occurrence_date) DO NOTHING",
            )
            .bind(link.main_request_id)
            .bind(link.generated_request_id)
            .bind(link.occurrence_date)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    async fn delete_links(
        &mut self,
        main_request_id: i64,
        occurrence_dates: &[NaiveDate],
    ) -> EngineResult<()> {
        if occurrence_dates.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "DELETE FROM steward_occurrence_links \
             WHERE main_request_id = $1 AND occurrence_date = ANY($2)",
        )
        .bind(main_request_id)
        .bind(occurrence_dates)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_note(&mut self, note: NewRequestNote) -> EngineResult<RequestNote> {
        let media = serde_json::to_value(&note.media)
            .map_err(|e| EngineError::dependency(format!("media encoding failed: {e}")))?;
        let row = sqlx::query(
            "INSERT INTO steward_request_notes \
                 (service_request_id, status_before, status_after, author_role, \
                  author_id, text, media, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             RETURNING id, service_request_id, status_before, status_after, \
                 author_role, author_id, text, media, created_at",
        )
        .bind(note.service_request_id)
        .bind(note.status_before.map(|s| s.to_string()))
        .bind(note.status_after.to_string())
        .bind(note.author.role.to_string())
        .bind(note.author.id)
        .bind(&note.text)
        .bind(media)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        map_note_row(&row)
    }

    async fn find_note(&mut self, note_id: i64) -> EngineResult<Option<RequestNote>> {
        let row = sqlx::query(
            "SELECT id, service_request_id, status_before, status_after, \
                 author_role, author_id, text, media, created_at \
             FROM steward_request_notes WHERE id = $1",
        )
        .bind(note_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.map(|row| map_note_row(&row)).transpose()
    }

    async fn update_note_text(&mut self, note_id: i64, text: &str) -> EngineResult<()> {
        let result = sqlx::query("UPDATE steward_request_notes SET text = $2 WHERE id = $1")
            .bind(note_id)
            .bind(text)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found(format!("note {note_id}")));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> EngineResult<()> {
        self.tx.commit().await.map_err(db_err)
    }

    async fn rollback(self: Box<Self>) -> EngineResult<()> {
        self.tx.rollback().await.map_err(db_err)
    }
}

fn db_err(err: sqlx::Error) -> EngineError {
    EngineError::Dependency(format!("database error: {err}"))
}

fn parse_col<T>(value: &str, column: &str) -> EngineResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| EngineError::dependency(format!("corrupt {column} column: {e}")))
}

fn map_stored_request(row: &PgRow) -> EngineResult<StoredRequest> {
    let status: String = row.try_get("status").map_err(db_err)?;
    let owner_approval: String = row.try_get("owner_approval").map_err(db_err)?;
    let distribution_type: String = row.try_get("distribution_type").map_err(db_err)?;
    let priority: String = row.try_get("priority").map_err(db_err)?;
    let created_by_role: String = row.try_get("created_by_role").map_err(db_err)?;

    let cancellation = match row
        .try_get::<Option<String>, _>("cancelled_by_role")
        .map_err(db_err)?
    {
        Some(role) => {
            let at_status: String = row.try_get("cancelled_at_status").map_err(db_err)?;
            Some(Cancellation {
                cancelled_by: Actor {
                    role: parse_col(&role, "cancelled_by_role")?,
                    id: row.try_get("cancelled_by_id").map_err(db_err)?,
                },
                at_status: parse_col(&at_status, "cancelled_at_status")?,
                cancelled_at: row.try_get("cancelled_at").map_err(db_err)?,
                reason: row.try_get("cancellation_reason").map_err(db_err)?,
            })
        }
        None => None,
    };

    let request = ServiceRequest {
        id: row.try_get("id").map_err(db_err)?,
        franchise_id: row.try_get("franchise_id").map_err(db_err)?,
        property_id: row.try_get("property_id").map_err(db_err)?,
        service_type_id: row.try_get("service_type_id").map_err(db_err)?,
        owner_id: row.try_get("owner_id").map_err(db_err)?,
        vendor_id: row.try_get("vendor_id").map_err(db_err)?,
        status: parse_col(&status, "status")?,
        owner_approval: parse_col(&owner_approval, "owner_approval")?,
        distribution_type: parse_col(&distribution_type, "distribution_type")?,
        priority: parse_col(&priority, "priority")?,
        description: row.try_get("description").map_err(db_err)?,
        scheduled_start: row.try_get("scheduled_start").map_err(db_err)?,
        scheduled_end: row.try_get("scheduled_end").map_err(db_err)?,
        parent_id: row.try_get("parent_id").map_err(db_err)?,
        is_discrepancy: row.try_get("is_discrepancy").map_err(db_err)?,
        is_guest: row.try_get("is_guest").map_err(db_err)?,
        is_guest_concierge: row.try_get("is_guest_concierge").map_err(db_err)?,
        is_recurring: row.try_get("is_recurring").map_err(db_err)?,
        is_turn_over: row.try_get("is_turn_over").map_err(db_err)?,
        linen_detail: row.try_get("linen_detail").map_err(db_err)?,
        cancellation,
        invoice_id: row.try_get("invoice_id").map_err(db_err)?,
        created_by: Actor {
            role: parse_col(&created_by_role, "created_by_role")?,
            id: row.try_get("created_by_id").map_err(db_err)?,
        },
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    };

    Ok(StoredRequest {
        request,
        version: row.try_get("version").map_err(db_err)?,
    })
}

fn map_claim_row(row: &PgRow) -> EngineResult<VendorClaim> {
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(VendorClaim {
        service_request_id: row.try_get("service_request_id").map_err(db_err)?,
        vendor_id: row.try_get("vendor_id").map_err(db_err)?,
        status: parse_col(&status, "status")?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn map_schedule_row(row: &PgRow) -> EngineResult<RecurringSchedule> {
    let unit: String = row.try_get("unit").map_err(db_err)?;
    let weekdays: serde_json::Value = row.try_get("weekdays").map_err(db_err)?;
    let interval: i64 = row.try_get("interval_count").map_err(db_err)?;
    Ok(RecurringSchedule {
        service_request_id: row.try_get("service_request_id").map_err(db_err)?,
        interval: u32::try_from(interval)
            .map_err(|_| EngineError::dependency("corrupt interval_count column".to_string()))?,
        unit: parse_col(&unit, "unit")?,
        until: row.try_get("until").map_err(db_err)?,
        weekdays: serde_json::from_value(weekdays)
            .map_err(|e| EngineError::dependency(format!("corrupt weekdays column: {e}")))?,
    })
}

fn map_link_row(row: &PgRow) -> EngineResult<OccurrenceLink> {
    Ok(OccurrenceLink {
        main_request_id: row.try_get("main_request_id").map_err(db_err)?,
        generated_request_id: row.try_get("generated_request_id").map_err(db_err)?,
        occurrence_date: row.try_get("occurrence_date").map_err(db_err)?,
    })
}

fn map_note_row(row: &PgRow) -> EngineResult<RequestNote> {
    let status_before: Option<String> = row.try_get("status_before").map_err(db_err)?;
    let status_after: String = row.try_get("status_after").map_err(db_err)?;
    let author_role: String = row.try_get("author_role").map_err(db_err)?;
    let media: serde_json::Value = row.try_get("media").map_err(db_err)?;
    Ok(RequestNote {
        id: row.try_get("id").map_err(db_err)?,
        service_request_id: row.try_get("service_request_id").map_err(db_err)?,
        status_before: status_before
            .map(|s| parse_col(&s, "status_before"))
            .transpose()?,
        status_after: parse_col(&status_after, "status_after")?,
        author: Actor {
            role: parse_col(&author_role, "author_role")?,
            id: row.try_get("author_id").map_err(db_err)?,
        },
        text: row.try_get("text").map_err(db_err)?,
        media: serde_json::from_value(media)
            .map_err(|e| EngineError::dependency(format!("corrupt media column: {e}")))?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}
